//! Request construction for provider queries
//!
//! Providers take the address as one flat text field plus a handful
//! of fixed parameters; only the field name differs between them.

/// Builds the flat key/value query for one provider.
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    field: &'static str,
    common: Vec<(String, String)>,
}

impl QueryTemplate {
    /// `field` is the provider's name for the free-text address parameter.
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            common: Vec::new(),
        }
    }

    /// Add a fixed parameter sent with every query.
    pub fn with_common(mut self, name: &str, value: &str) -> Self {
        self.common.push((name.to_string(), value.to_string()));
        self
    }

    pub fn build(&self, address: &str) -> Vec<(String, String)> {
        let mut params = vec![(self.field.to_string(), address.to_string())];
        params.extend(self.common.iter().cloned());
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_puts_address_in_named_field() {
        let template = QueryTemplate::new("searchText");
        let params = template.build("1 Main St, Town, ST 00000");
        assert_eq!(
            params,
            vec![(
                "searchText".to_string(),
                "1 Main St, Town, ST 00000".to_string()
            )]
        );
    }

    #[test]
    fn test_build_appends_common_parameters() {
        let template = QueryTemplate::new("q").with_common("countryFilter", "US");
        let params = template.build("addr");
        assert_eq!(params.len(), 2);
        assert_eq!(params[1], ("countryFilter".to_string(), "US".to_string()));
    }
}
