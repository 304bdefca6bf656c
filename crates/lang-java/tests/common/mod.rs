#![allow(dead_code)]

use lathe_java::binary::MemorySource;
use lathe_java::fixtures::{ACC_FINAL, ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC, ACC_SUPER, ClassFileWriter};

/// `p.Outer` declaring one member class, `Inner`.
pub fn outer() -> Vec<u8> {
    ClassFileWriter::new("p/Outer", ACC_PUBLIC | ACC_SUPER)
        .inner_class("p/Outer$Inner", Some("p/Outer"), Some("Inner"), ACC_PUBLIC | ACC_STATIC)
        .field(ACC_PRIVATE | ACC_FINAL, "name", "Ljava/lang/String;", &[])
        .method(ACC_PUBLIC, "<init>", "(Ljava/lang/String;)V", &[])
        .method(ACC_PUBLIC, "name", "()Ljava/lang/String;", &[])
        .finish()
}

pub fn inner() -> Vec<u8> {
    ClassFileWriter::new("p/Outer$Inner", ACC_PUBLIC | ACC_SUPER)
        .inner_class("p/Outer$Inner", Some("p/Outer"), Some("Inner"), ACC_PUBLIC | ACC_STATIC)
        .field(ACC_PUBLIC, "size", "I", &[])
        .method(ACC_PUBLIC, "<init>", "()V", &[])
        .finish()
}

/// Named like a member of `p.Outer` but declared inside `p.Other`.
pub fn stray() -> Vec<u8> {
    ClassFileWriter::new("p/Outer$Stray", ACC_PUBLIC | ACC_SUPER)
        .inner_class("p/Outer$Stray", Some("p/Other"), Some("Stray"), ACC_PUBLIC | ACC_STATIC)
        .method(ACC_PUBLIC, "<init>", "()V", &[])
        .finish()
}

/// A local class: its own row has no outer class.
pub fn local() -> Vec<u8> {
    ClassFileWriter::new("p/Outer$1Local", ACC_SUPER)
        .inner_class("p/Outer$1Local", None, Some("Local"), 0)
        .method(0, "<init>", "()V", &[])
        .finish()
}

pub fn memory_source() -> MemorySource {
    let mut source = MemorySource::new();
    source.insert("p.Outer$Inner", inner());
    source.insert("p.Outer$Stray", stray());
    source.insert("p.Outer$1Local", local());
    source
}
