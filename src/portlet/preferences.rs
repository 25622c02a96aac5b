use std::collections::HashMap;

/// Per-window portlet preferences: each name maps to an ordered list of values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortletPreferences {
    values: HashMap<String, Vec<String>>,
}

impl PortletPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_values(name, values);
        self
    }

    pub fn set_values<I, S>(&mut self, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values
            .insert(name.into(), values.into_iter().map(Into::into).collect());
    }

    /// Values stored under `name`, or an empty slice.
    pub fn values(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_preference_yields_empty_values() {
        let prefs = PortletPreferences::new().with_values("primaryAttribute", ["empl", "netid"]);

        assert_eq!(prefs.values("primaryAttribute"), ["empl", "netid"]);
        assert_eq!(prefs.value("primaryAttribute"), Some("empl"));
        assert!(prefs.values("other").is_empty());
    }
}
