/// Join the non-empty parts with `.`.
pub fn join_name<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut name = String::new();
    for part in parts.into_iter().filter(|part| !part.is_empty()) {
        if !name.is_empty() {
            name.push('.');
        }
        name.push_str(part);
    }
    name
}

/// The part of `name` before the first `.`, or all of it.
pub fn endpoint_of(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

/// Builds reported names from registry names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Naming {
    prefix: Option<String>,
    prefix_to_remove: Option<String>,
}

impl Naming {
    pub fn new(prefix: Option<String>, prefix_to_remove: Option<String>) -> Self {
        Naming {
            prefix,
            prefix_to_remove,
        }
    }

    /// `<prefix>.<components...>`. Occurrences of the prefix to remove are
    /// deleted from the first component only.
    pub fn prefix(&self, components: &[&str]) -> String {
        let first = components.first().map(|first| match self.prefix_to_remove.as_deref() {
            Some(remove) if !remove.is_empty() => first.replace(remove, ""),
            _ => (*first).to_owned(),
        });
        let rest = components.iter().skip(1).copied();
        join_name(self.prefix.as_deref().into_iter().chain(first.as_deref()).chain(rest))
    }
}
