mod loader;
pub use loader::*;

use std::collections::HashMap;

use tera::{Context, Tera};

use serde_json::Value;

/// One email's templates for a single locale. A slot is `None` when no file
/// existed under the matching field folder.
#[derive(Debug, Clone, Default)]
pub struct LocalizedEmail {
    pub subject: Option<Template>,
    pub text: Option<Template>,
    pub html: Option<Template>,
}

/// Locale -> localized templates, for one email name.
pub type LocaleTemplates = HashMap<String, LocalizedEmail>;

/// Email name -> locale map. Built once by the loader, read-only afterwards.
pub type EmailIndex = HashMap<String, LocaleTemplates>;

/// Layout name -> wrapper template. Layouts are always compiled and render
/// with the caller's data extended by an `html` variable.
pub type LayoutIndex = HashMap<String, Template>;

#[derive(Debug, Clone)]
pub enum Template {
    /// Source text kept verbatim, parsed on every render.
    Raw(String),
    /// Parsed once when loaded. Syntax errors surface at load time.
    Compiled { name: String, tera: Tera },
}

impl Template {
    pub fn compile(name: &str, source: &str) -> Result<Self, tera::Error> {
        let mut tera = Tera::default();

        tera.autoescape_on(vec![]);

        tera.add_raw_template(name, source)?;

        Ok(Template::Compiled {
            name: name.to_string(),
            tera,
        })
    }

    pub fn render(&self, data: &Value) -> Result<String, tera::Error> {
        self.render_context(&build_context(data))
    }

    pub(crate) fn render_context(&self, context: &Context) -> Result<String, tera::Error> {
        match self {
            Template::Raw(source) => Tera::one_off(source, context, false),
            Template::Compiled { name, tera } => tera.render(name, context),
        }
    }
}

pub(crate) fn build_context(data: &Value) -> Context {
    let mut context = Context::new();

    match data {
        Value::Object(obj) => {
            for (k, v) in obj {
                context.insert(k, v);
            }
        }
        Value::Null => {
            // Empty context is fine
        }
        _ => {
            context.insert("data", data);
        }
    }

    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_renders_per_call() {
        let template = Template::Raw("Hello {{ name }}!".to_string());
        let out = template.render(&json!({"name": "Ana"})).unwrap();
        assert_eq!(out, "Hello Ana!");
    }

    #[test]
    fn compiled_renders_same_output() {
        let template = Template::compile("greeting.html", "Hello {{ name }}!").unwrap();
        let out = template.render(&json!({"name": "Ana"})).unwrap();
        assert_eq!(out, "Hello Ana!");
    }

    #[test]
    fn render_is_deterministic() {
        let template = Template::Raw("<p>{{ city }}</p>".to_string());
        let data = json!({"city": "Lund"});
        assert_eq!(
            template.render(&data).unwrap(),
            template.render(&data).unwrap()
        );
    }

    #[test]
    fn empty_data_leaves_static_content() {
        let template = Template::Raw("no placeholders here".to_string());
        let out = template.render(&json!({})).unwrap();
        assert_eq!(out, "no placeholders here");
    }

    #[test]
    fn non_object_data_binds_as_data() {
        let template = Template::Raw("value: {{ data }}".to_string());
        let out = template.render(&json!(42)).unwrap();
        assert_eq!(out, "value: 42");
    }

    #[test]
    fn compile_rejects_bad_syntax() {
        assert!(Template::compile("broken.html", "{{ unclosed").is_err());
    }

    #[test]
    fn raw_bad_syntax_fails_at_render() {
        let template = Template::Raw("{{ unclosed".to_string());
        assert!(template.render(&json!({})).is_err());
    }

    #[test]
    fn html_is_not_escaped() {
        let template = Template::Raw("{{ html }}".to_string());
        let out = template.render(&json!({"html": "<b>hi</b>"})).unwrap();
        assert_eq!(out, "<b>hi</b>");
    }
}
