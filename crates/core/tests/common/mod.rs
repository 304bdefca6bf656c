#![allow(dead_code)]

use lathe_api::{TextRange, TextSize};
use lathe_core::{ModelConfig, ModelContext};
use lathe_java::java_frontend;

pub const SOURCE: &str = r#"package demo;

import java.util.List;

public class Service {
    private int count;

    public void first(int times) {
        if (times > 0) {
            work(times);
        }
    }

    public int second() {
        return count;
    }
}
"#;

pub fn context() -> ModelContext {
    ModelContext::builder()
        .config(ModelConfig::default().strict(true).cross_check(true))
        .frontend(java_frontend())
        .build()
        .expect("context")
}

pub fn offset_of(text: &str, needle: &str) -> TextSize {
    TextSize::from(text.find(needle).unwrap_or_else(|| panic!("{needle:?} not in text")) as u32)
}

pub fn range_of(text: &str, needle: &str) -> TextRange {
    TextRange::at(offset_of(text, needle), TextSize::of(needle))
}

/// Just before the closing brace of the last class in `text`.
pub fn class_end(text: &str) -> TextSize {
    TextSize::from(text.rfind('}').expect("closing brace") as u32)
}
