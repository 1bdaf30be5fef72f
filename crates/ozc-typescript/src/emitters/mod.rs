pub mod index;
pub mod operations;
pub mod support;
pub mod types;

use minijinja::Environment;

/// Escape `*/` sequences that would prematurely close JSDoc comment blocks.
fn escape_jsdoc(value: String) -> String {
    value.replace("*/", "*\\/")
}

/// Template environment shared by every emitter in one run.
pub fn environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env.add_filter("escape_jsdoc", escape_jsdoc);
    env.add_template("index.ts.j2", include_str!("../../templates/index.ts.j2"))?;
    env.add_template("operation.ts.j2", include_str!("../../templates/operation.ts.j2"))?;
    env.add_template("support.ts.j2", include_str!("../../templates/support.ts.j2"))?;
    env.add_template("type.ts.j2", include_str!("../../templates/type.ts.j2"))?;
    Ok(env)
}

/// A double-quoted string literal, valid in TypeScript.
pub fn string_literal(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_parse() {
        let env = environment().unwrap();
        assert!(env.get_template("operation.ts.j2").is_ok());
    }

    #[test]
    fn test_string_literal_escapes() {
        assert_eq!(string_literal("/pets/{id}"), r#""/pets/{id}""#);
        assert_eq!(string_literal("say \"hi\""), r#""say \"hi\"""#);
    }

    #[test]
    fn test_escape_jsdoc() {
        assert_eq!(escape_jsdoc("a */ b".to_string()), "a *\\/ b");
    }
}
