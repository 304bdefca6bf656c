//! Generic `Signature` attribute strings, rendered as source text.

use super::converter::source_name;
use lathe_api::{FormatError, FormatResult};

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassSignature {
    pub type_params: Option<String>,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSignature {
    pub type_params: Option<String>,
    pub params: Vec<String>,
    pub return_type: String,
    pub throws: Vec<String>,
}

pub fn parse_class_signature(signature: &str) -> FormatResult<ClassSignature> {
    let mut reader = Reader::new(signature);
    let type_params = reader.type_params()?;
    let super_class = Some(reader.reference_type(0)?);
    let mut interfaces = Vec::new();
    while !reader.at_end() {
        interfaces.push(reader.reference_type(0)?);
    }
    Ok(ClassSignature {
        type_params,
        super_class,
        interfaces,
    })
}

pub fn parse_method_signature(signature: &str) -> FormatResult<MethodSignature> {
    let mut reader = Reader::new(signature);
    let type_params = reader.type_params()?;
    reader.expect(b'(')?;
    let mut params = Vec::new();
    while reader.peek() != Some(b')') {
        params.push(reader.java_type(0)?);
    }
    reader.expect(b')')?;
    let return_type = if reader.peek() == Some(b'V') {
        reader.pos += 1;
        "void".to_string()
    } else {
        reader.java_type(0)?
    };
    let mut throws = Vec::new();
    while reader.peek() == Some(b'^') {
        reader.pos += 1;
        throws.push(reader.reference_type(0)?);
    }
    Ok(MethodSignature {
        type_params,
        params,
        return_type,
        throws,
    })
}

pub fn parse_field_signature(signature: &str) -> FormatResult<String> {
    let mut reader = Reader::new(signature);
    let rendered = reader.reference_type(0)?;
    if !reader.at_end() {
        return Err(reader.error("trailing characters"));
    }
    Ok(rendered)
}

struct Reader<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, reason: &str) -> FormatError {
        FormatError::Signature {
            signature: self.text.to_string(),
            reason: format!("{reason} at {}", self.pos),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> FormatResult<()> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    /// Identifier up to one of the signature delimiters.
    fn identifier(&mut self) -> FormatResult<&'a str> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'.' | b';' | b'[' | b'/' | b'<' | b'>' | b':') {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("empty identifier"));
        }
        Ok(&self.text[start..self.pos])
    }

    /// `<T:Ljava/lang/Object;U::Ljava/lang/Comparable<TU;>;>` as
    /// `<T, U extends java.lang.Comparable<U>>`.
    fn type_params(&mut self) -> FormatResult<Option<String>> {
        if self.peek() != Some(b'<') {
            return Ok(None);
        }
        self.pos += 1;
        let mut params = Vec::new();
        while self.peek() != Some(b'>') {
            if self.at_end() {
                return Err(self.error("unterminated type parameters"));
            }
            let name = self.identifier()?;
            let mut bounds = Vec::new();
            self.expect(b':')?;
            if !matches!(self.peek(), Some(b':') | Some(b'>')) {
                bounds.push(self.reference_type(0)?);
            }
            while self.peek() == Some(b':') {
                self.pos += 1;
                bounds.push(self.reference_type(0)?);
            }
            if bounds.len() == 1 && bounds[0] == "java.lang.Object" {
                bounds.clear();
            }
            if bounds.is_empty() {
                params.push(name.to_string());
            } else {
                params.push(format!("{name} extends {}", bounds.join(" & ")));
            }
        }
        self.pos += 1;
        Ok(Some(format!("<{}>", params.join(", "))))
    }

    fn java_type(&mut self, depth: usize) -> FormatResult<String> {
        let base = match self.peek() {
            Some(b'B') => "byte",
            Some(b'C') => "char",
            Some(b'D') => "double",
            Some(b'F') => "float",
            Some(b'I') => "int",
            Some(b'J') => "long",
            Some(b'S') => "short",
            Some(b'Z') => "boolean",
            _ => return self.reference_type(depth),
        };
        self.pos += 1;
        Ok(base.to_string())
    }

    fn reference_type(&mut self, depth: usize) -> FormatResult<String> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        match self.peek() {
            Some(b'L') => {
                self.pos += 1;
                self.class_type(depth)
            }
            Some(b'T') => {
                self.pos += 1;
                let name = self.identifier()?;
                self.expect(b';')?;
                Ok(name.to_string())
            }
            Some(b'[') => {
                self.pos += 1;
                Ok(format!("{}[]", self.java_type(depth + 1)?))
            }
            _ => Err(self.error("expected a reference type")),
        }
    }

    /// After `L`: `pkg/Outer<args>.Inner<args>;`.
    fn class_type(&mut self, depth: usize) -> FormatResult<String> {
        let mut out = String::new();
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'<' | b'.' | b';') {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("empty class name"));
        }
        out.push_str(&source_name(&self.text[start..self.pos]));
        loop {
            if self.peek() == Some(b'<') {
                out.push_str(&self.type_args(depth)?);
            }
            match self.peek() {
                Some(b'.') => {
                    self.pos += 1;
                    out.push('.');
                    out.push_str(self.identifier()?);
                }
                Some(b';') => {
                    self.pos += 1;
                    return Ok(out);
                }
                _ => return Err(self.error("unterminated class type")),
            }
        }
    }

    fn type_args(&mut self, depth: usize) -> FormatResult<String> {
        self.expect(b'<')?;
        let mut args = Vec::new();
        while self.peek() != Some(b'>') {
            let arg = match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    "?".to_string()
                }
                Some(b'+') => {
                    self.pos += 1;
                    format!("? extends {}", self.reference_type(depth + 1)?)
                }
                Some(b'-') => {
                    self.pos += 1;
                    format!("? super {}", self.reference_type(depth + 1)?)
                }
                None => return Err(self.error("unterminated type arguments")),
                _ => self.reference_type(depth + 1)?,
            };
            args.push(arg);
        }
        self.pos += 1;
        Ok(format!("<{}>", args.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_signature() {
        let sig = parse_class_signature(
            "<K::Ljava/lang/Comparable<TK;>;V:Ljava/lang/Object;>Ljava/util/AbstractMap<TK;TV;>;Ljava/io/Serializable;",
        )
        .expect("signature");
        assert_eq!(
            sig.type_params.as_deref(),
            Some("<K extends java.lang.Comparable<K>, V>")
        );
        assert_eq!(sig.super_class.as_deref(), Some("java.util.AbstractMap<K, V>"));
        assert_eq!(sig.interfaces, vec!["java.io.Serializable"]);
    }

    #[test]
    fn test_method_signature() {
        let sig = parse_method_signature(
            "<T:Ljava/lang/Object;>(Ljava/util/List<+TT;>;[I)Ljava/util/Map<Ljava/lang/String;*>;^Ljava/io/IOException;",
        )
        .expect("signature");
        assert_eq!(sig.type_params.as_deref(), Some("<T>"));
        assert_eq!(sig.params, vec!["java.util.List<? extends T>", "int[]"]);
        assert_eq!(sig.return_type, "java.util.Map<java.lang.String, ?>");
        assert_eq!(sig.throws, vec!["java.io.IOException"]);
    }

    #[test]
    fn test_inner_class_type() {
        assert_eq!(
            parse_field_signature("Lp/Outer<TT;>.Inner<-Ljava/lang/Number;>;").expect("signature"),
            "p.Outer<T>.Inner<? super java.lang.Number>"
        );
    }

    #[test]
    fn test_malformed_signature_is_an_error() {
        assert!(matches!(
            parse_field_signature("Ljava/util/List<"),
            Err(FormatError::Signature { .. })
        ));
    }
}
