use regex::{Captures, Regex};
use std::fmt::Display;
use std::sync::LazyLock;

pub const NAMESPACE_SEPARATOR: &str = "::";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\d+)\}").expect("placeholder pattern compiles"));

/// Prefix applied to every key a context manages
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `"{namespace}::{key}"`, applied even when the namespace is empty
    pub fn qualify(&self, key: &str) -> String {
        format!("{}{}{}", self.0, NAMESPACE_SEPARATOR, key)
    }
}

/// Key with positional `{i}` placeholders, e.g. `"user:{0}:posts:{1}"`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyTemplate(String);

impl KeyTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitutes `{i}` with `args[i]`. Placeholders past the end of `args` stay literal.
    pub fn resolve<S: AsRef<str>>(&self, args: &[S]) -> String {
        PLACEHOLDER
            .replace_all(&self.0, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| args.get(index))
                    .map(|arg| arg.as_ref().to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

impl From<&str> for KeyTemplate {
    fn from(template: &str) -> Self {
        KeyTemplate::new(template)
    }
}

impl From<String> for KeyTemplate {
    fn from(template: String) -> Self {
        KeyTemplate::new(template)
    }
}

/// Call arguments that can be rendered positionally into a key template
pub trait TemplateArgs {
    fn template_values(&self) -> Vec<String>;
}

impl TemplateArgs for () {
    fn template_values(&self) -> Vec<String> {
        Vec::new()
    }
}

impl<T: Display> TemplateArgs for Vec<T> {
    fn template_values(&self) -> Vec<String> {
        self.iter().map(ToString::to_string).collect()
    }
}

impl<T: Display, const N: usize> TemplateArgs for [T; N] {
    fn template_values(&self) -> Vec<String> {
        self.iter().map(ToString::to_string).collect()
    }
}

macro_rules! tuple_template_args {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Display),+> TemplateArgs for ($($name,)+) {
            fn template_values(&self) -> Vec<String> {
                vec![$(self.$idx.to_string()),+]
            }
        }
    };
}

tuple_template_args!(A: 0);
tuple_template_args!(A: 0, B: 1);
tuple_template_args!(A: 0, B: 1, C: 2);
tuple_template_args!(A: 0, B: 1, C: 2, D: 3);
tuple_template_args!(A: 0, B: 1, C: 2, D: 3, E: 4);
tuple_template_args!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

/// Strategy for deriving a cache key from the arguments of a memoized call.
/// Must be deterministic: equal arguments have to produce equal keys.
pub trait KeyStrategy<A> {
    fn derive_key(&self, args: &A) -> String;
}

impl<A: TemplateArgs> KeyStrategy<A> for KeyTemplate {
    fn derive_key(&self, args: &A) -> String {
        self.resolve(&args.template_values())
    }
}

/// Key derivation through a caller-supplied function
#[derive(Clone)]
pub struct KeyFn<G>(pub G);

impl<A, G> KeyStrategy<A> for KeyFn<G>
where
    G: Fn(&A) -> String,
{
    fn derive_key(&self, args: &A) -> String {
        (self.0)(args)
    }
}
