//! Template context adapter and Tera-backed rendering

use miette::Diagnostic;
use serde_json::{Map, Value as JsonValue};
use std::borrow::Cow;
use tera::Tera;
use thiserror::Error;

use crate::extension::Extensions;
use crate::model::{DataType, Extra, Property, Value};

/// Generic structured context for one data type
///
/// Keys mirror the schema document (`name`, `type`, `dataType`, ...) plus
/// derived fields (`isCollection`, `isOptional`, `rawDataType`, `isClass`,
/// `isEnum`). Unknown document keys are passed through; modeled and derived
/// keys win when names clash.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateContext {
    fields: Map<String, JsonValue>,
}

impl TemplateContext {
    pub fn from_data_type(data_type: &DataType) -> Self {
        let mut fields = data_type.extra().clone();
        fields.insert("name".into(), data_type.name().into());
        fields.insert("type".into(), data_type.kind().as_str().into());
        fields.insert("isClass".into(), matches!(data_type, DataType::Class(_)).into());
        fields.insert("isEnum".into(), matches!(data_type, DataType::Enum(_)).into());

        match data_type {
            DataType::Class(class) => {
                let properties = class.properties.iter().map(property_context).collect();
                fields.insert("properties".into(), JsonValue::Array(properties));
            }
            DataType::Enum(e) => {
                fields.insert("dataType".into(), e.data_type.to_string().into());
                fields.insert("rawDataType".into(), e.raw_data_type().into());
                let values = e.values.iter().map(value_context).collect();
                fields.insert("values".into(), JsonValue::Array(values));
            }
        }

        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.fields.get(key)
    }

    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.fields
    }

    pub fn to_value(&self) -> JsonValue {
        JsonValue::Object(self.fields.clone())
    }

    pub fn to_tera(&self) -> tera::Result<tera::Context> {
        tera::Context::from_value(self.to_value())
    }
}

fn with_extra(extra: &Extra, modeled: impl IntoIterator<Item = (&'static str, JsonValue)>) -> JsonValue {
    let mut fields = extra.clone();
    for (key, value) in modeled {
        fields.insert(key.to_string(), value);
    }
    JsonValue::Object(fields)
}

fn property_context(property: &Property) -> JsonValue {
    let mut modeled = vec![
        ("name", JsonValue::from(property.name.as_str())),
        ("dataType", property.data_type.to_string().into()),
        ("isCollection", property.is_collection().into()),
        ("isOptional", property.is_optional().into()),
        ("rawDataType", property.raw_data_type().into()),
    ];
    if let Some(description) = &property.description {
        modeled.push(("description", description.as_str().into()));
    }
    with_extra(&property.extra, modeled)
}

fn value_context(value: &Value) -> JsonValue {
    with_extra(
        &value.extra,
        [
            ("name", JsonValue::from(value.name.as_str())),
            ("value", value.value.as_str().into()),
        ],
    )
}

#[derive(Debug, Error, Diagnostic)]
pub enum RenderError {
    #[error("invalid template '{template}': {message}")]
    #[diagnostic(code(dtgen::render::template))]
    Template { template: String, message: String },

    #[error("failed to render '{data_type}': {message}")]
    #[diagnostic(
        code(dtgen::render::data_type),
        help("check that the template only uses fields present in the data type context")
    )]
    DataType { data_type: String, message: String },
}

/// Renders data types through a single user template
#[derive(Debug)]
pub struct TemplateGenerator {
    tera: Tera,
    template: String,
}

impl TemplateGenerator {
    /// Compile `source` under `name` with the extension filters installed
    pub fn new(name: &str, source: &str, extensions: &Extensions) -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        // Generated code is never HTML
        tera.autoescape_on(vec![]);
        extensions.install_filters(&mut tera);
        tera.add_raw_template(name, source)
            .map_err(|e| RenderError::Template {
                template: name.to_string(),
                message: describe_error(&e),
            })?;

        Ok(Self {
            tera,
            template: name.to_string(),
        })
    }

    pub fn template_name(&self) -> &str {
        &self.template
    }

    /// Render one data type
    pub fn render(&self, data_type: &DataType, extensions: &Extensions) -> Result<String, RenderError> {
        let fail = |e: tera::Error| RenderError::DataType {
            data_type: data_type.name().to_string(),
            message: describe_error(&e),
        };

        let context = TemplateContext::from_data_type(data_type);
        let tera = if extensions.has_tags() {
            let mut tera = self.tera.clone();
            extensions.install_tags(&mut tera, &context.to_value());
            Cow::Owned(tera)
        } else {
            Cow::Borrowed(&self.tera)
        };

        let context = context.to_tera().map_err(fail)?;
        tera.render(&self.template, &context).map_err(fail)
    }
}

/// Flatten a Tera error and its causes into one line
fn describe_error(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loader::SourceFile;
    use crate::model::{Class, Enum, TypeExpr};
    use serde_json::json;

    fn prop(name: &str, expr: &str) -> Property {
        Property::new(name, TypeExpr::parse(expr).unwrap())
    }

    fn point() -> DataType {
        Class::new("Point", vec![prop("x", "Int"), prop("y", "Int")]).into()
    }

    fn no_extensions() -> Extensions {
        Extensions::none().unwrap()
    }

    #[test]
    fn test_class_context_has_derived_fields() {
        let mut tags = prop("tags", "[String]?");
        tags.description = Some("Free-form labels".to_string());
        let class: DataType = Class::new("Post", vec![tags]).into();

        let context = TemplateContext::from_data_type(&class);
        assert_eq!(context.get("name").unwrap(), "Post");
        assert_eq!(context.get("type").unwrap(), "class");
        assert_eq!(context.get("isClass").unwrap(), true);
        assert_eq!(
            context.get("properties").unwrap(),
            &json!([{
                "name": "tags",
                "dataType": "[String]?",
                "isCollection": true,
                "isOptional": true,
                "rawDataType": "String",
                "description": "Free-form labels"
            }])
        );
    }

    #[test]
    fn test_enum_context() {
        let e: DataType = Enum::new("Role", "Int", vec![Value::new("admin", "1")]).into();
        let context = TemplateContext::from_data_type(&e);
        assert_eq!(context.get("type").unwrap(), "enum");
        assert_eq!(context.get("isEnum").unwrap(), true);
        assert_eq!(context.get("rawDataType").unwrap(), "Int");
        assert_eq!(
            context.get("values").unwrap(),
            &json!([{"name": "admin", "value": "1"}])
        );
    }

    #[test]
    fn test_extras_pass_through_and_modeled_keys_win() {
        let mut id = prop("id", "Int");
        id.extra.insert("jsonKey".into(), json!("user_id"));
        id.extra.insert("isOptional".into(), json!("spoofed"));
        let mut class = Class::new("User", vec![id]);
        class.extra.insert("table".into(), json!({"name": "users"}));
        class.extra.insert("name".into(), json!("Other"));

        let context = TemplateContext::from_data_type(&class.into());
        assert_eq!(context.get("table").unwrap(), &json!({"name": "users"}));
        assert_eq!(context.get("name").unwrap(), "User");
        let property = &context.get("properties").unwrap()[0];
        assert_eq!(property["jsonKey"], "user_id");
        assert_eq!(property["isOptional"], false);
    }

    #[test]
    fn test_render_point() {
        let extensions = no_extensions();
        let generator = TemplateGenerator::new(
            "model.txt",
            "name={{ name }}; fields={% for p in properties %}{{ p.name }}{% if not loop.last %},{% endif %}{% endfor %}",
            &extensions,
        )
        .unwrap();
        let output = generator.render(&point(), &extensions).unwrap();
        assert_eq!(output, "name=Point; fields=x,y");
    }

    #[test]
    fn test_output_is_not_html_escaped() {
        let extensions = no_extensions();
        let generator =
            TemplateGenerator::new("model.html", "{{ name }}<{{ type }}>", &extensions).unwrap();
        let class: DataType = Class::new("A&B", vec![]).into();
        assert_eq!(generator.render(&class, &extensions).unwrap(), "A&B<class>");
    }

    #[test]
    fn test_undefined_field_names_data_type() {
        let extensions = no_extensions();
        let generator = TemplateGenerator::new("model.txt", "{{ nope }}", &extensions).unwrap();
        let err = generator.render(&point(), &extensions).unwrap_err();
        let RenderError::DataType { data_type, message } = err else {
            panic!("expected data type error");
        };
        assert_eq!(data_type, "Point");
        assert!(message.contains("nope"), "{message}");
    }

    #[test]
    fn test_invalid_template() {
        let extensions = no_extensions();
        let err = TemplateGenerator::new("model.txt", "{% for %}", &extensions).unwrap_err();
        assert!(matches!(err, RenderError::Template { .. }));
    }

    #[test]
    fn test_script_filter_in_template() {
        let extensions = Extensions::load(&[SourceFile::new(
            "upper.lua",
            r#"
            function to_upper(s) return string.upper(s) end
            registerFilter("upper", "to_upper", "string")
            "#,
        )])
        .unwrap();
        let generator =
            TemplateGenerator::new("model.txt", "{{ name | upper }}", &extensions).unwrap();
        let class: DataType = Class::new("abc", vec![]).into();
        assert_eq!(generator.render(&class, &extensions).unwrap(), "ABC");
    }

    #[test]
    fn test_removed_filter_function_fails_render() {
        let extensions = Extensions::load(&[SourceFile::new(
            "upper.lua",
            r#"
            function to_upper(s) return string.upper(s) end
            registerFilter("upper", "to_upper", "string")
            "#,
        )])
        .unwrap();
        let generator =
            TemplateGenerator::new("model.txt", "{{ name | upper }}", &extensions).unwrap();
        extensions.eval("to_upper = nil").unwrap();

        let err = generator.render(&point(), &extensions).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Point"), "{message}");
        assert!(message.contains("to_upper"), "{message}");
    }

    #[test]
    fn test_script_tag_in_template() {
        let extensions = Extensions::load(&[SourceFile::new(
            "header.lua",
            r#"
            function header(ctx)
                return "// " .. ctx.name .. " has " .. #ctx.properties .. " fields"
            end
            registerTag("header", "header")
            "#,
        )])
        .unwrap();
        let generator = TemplateGenerator::new("model.txt", "{{ header() }}", &extensions).unwrap();
        assert_eq!(
            generator.render(&point(), &extensions).unwrap(),
            "// Point has 2 fields"
        );
    }

    fn header_extensions(body: &str) -> Extensions {
        Extensions::load(&[SourceFile::new(
            "header.lua",
            format!("function render_header(ctx) {} end\nregisterTag(\"header\", \"render_header\")", body),
        )])
        .unwrap()
    }

    #[test]
    fn test_removed_tag_function_fails_render() {
        let extensions = header_extensions("return ''");
        let generator = TemplateGenerator::new("model.txt", "{{ header() }}", &extensions).unwrap();
        extensions.eval("render_header = nil").unwrap();

        let err = generator.render(&point(), &extensions).unwrap_err();
        let RenderError::DataType { data_type, message } = err else {
            panic!("expected data type error");
        };
        assert_eq!(data_type, "Point");
        assert!(message.contains("tag 'header' failed"), "{message}");
        assert!(message.contains("render_header"), "{message}");
    }

    #[test]
    fn test_raising_tag_fails_render() {
        let extensions = header_extensions("error('no header today')");
        let generator = TemplateGenerator::new("model.txt", "{{ header() }}", &extensions).unwrap();

        let err = generator.render(&point(), &extensions).unwrap_err();
        let RenderError::DataType { message, .. } = err else {
            panic!("expected data type error");
        };
        assert!(message.contains("tag 'header' failed"), "{message}");
        assert!(message.contains("render_header"), "{message}");
        assert!(message.contains("no header today"), "{message}");
    }

    #[test]
    fn test_tag_sees_loop_variable_passed_as_argument() {
        let extensions = Extensions::load(&[SourceFile::new(
            "field.lua",
            r#"
            function field(ctx) return ctx.name .. "." .. ctx.p.name end
            registerTag("field", "field")
            "#,
        )])
        .unwrap();
        let generator = TemplateGenerator::new(
            "model.txt",
            "{% for p in properties %}{{ field(p=p) }} {% endfor %}",
            &extensions,
        )
        .unwrap();
        assert_eq!(
            generator.render(&point(), &extensions).unwrap(),
            "Point.x Point.y "
        );
    }
}
