//! Segment templates.
//!
//! A thin layer over minijinja: every template is compiled against one
//! serialisable context type, undefined names are errors, and `none` values
//! render as nothing so optional fields simply disappear.

use minijinja::value::Value;
use minijinja::{Environment, ErrorKind, Output, State, UndefinedBehavior};
use serde::Serialize;
use std::collections::HashSet;
use std::marker::PhantomData;

const TEMPLATE_NAME: &str = "segment";

/// Globals minijinja provides on its own; never context fields.
const BUILTIN_GLOBALS: &[&str] = &["range", "dict", "namespace", "debug"];

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("{0}")]
    Engine(#[from] minijinja::Error),

    #[error("unknown field `{0}`")]
    UnknownField(String),
}

/// Environment shared by all modules: strict undefined handling, empty
/// output for `none`, and the `fixed` precision filter.
pub fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_formatter(skip_none);
    env.add_filter("fixed", fixed);
    env
}

fn skip_none(out: &mut Output<'_>, state: &State<'_, '_>, value: &Value) -> Result<(), minijinja::Error> {
    if value.is_none() {
        return Ok(());
    }
    minijinja::escape_formatter(out, state, value)
}

/// `{{ x|fixed(2) }}`: a number with the given count of decimals.
fn fixed(value: Value, digits: Option<usize>) -> String {
    if value.is_none() || value.is_undefined() {
        return String::new();
    }
    match f64::try_from(value.clone()) {
        Ok(number) => format!("{:.*}", digits.unwrap_or(0), number),
        Err(_) => value.to_string(),
    }
}

/// A compiled template bound to the context type `T`.
pub struct SegmentTemplate<T> {
    env: Environment<'static>,
    source: String,
    _context: PhantomData<fn(&T)>,
}

impl<T: Serialize + Default> SegmentTemplate<T> {
    /// Compile `source` in `env`. Names that are not fields of `T`, and
    /// filters or tests that `env` does not know, fail here rather than
    /// on every render.
    pub fn compile(mut env: Environment<'static>, source: &str) -> Result<Self, TemplateError> {
        env.add_template_owned(TEMPLATE_NAME, source.to_string())?;
        {
            let template = env.get_template(TEMPLATE_NAME)?;
            let fields = field_names::<T>();
            let mut unknown: Vec<String> = template
                .undeclared_variables(false)
                .into_iter()
                .filter(|name| !fields.contains(name) && !BUILTIN_GLOBALS.contains(&name.as_str()))
                .collect();
            unknown.sort();
            if let Some(name) = unknown.into_iter().next() {
                return Err(TemplateError::UnknownField(name));
            }

            // Filters and tests are only resolved while rendering.
            if let Err(e) = template.render(T::default()) {
                if matches!(
                    e.kind(),
                    ErrorKind::UnknownFilter | ErrorKind::UnknownTest | ErrorKind::UnknownFunction
                ) {
                    return Err(e.into());
                }
            }
        }

        Ok(Self {
            env,
            source: source.to_string(),
            _context: PhantomData,
        })
    }

    pub fn render(&self, context: &T) -> Result<String, TemplateError> {
        let template = self.env.get_template(TEMPLATE_NAME)?;
        Ok(template.render(context)?)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

fn field_names<T: Serialize + Default>() -> HashSet<String> {
    match serde_json::to_value(T::default()) {
        Ok(serde_json::Value::Object(map)) => map.into_iter().map(|(key, _)| key).collect(),
        _ => HashSet::new(),
    }
}
