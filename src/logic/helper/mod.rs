#[macro_use]
mod r#macro;
