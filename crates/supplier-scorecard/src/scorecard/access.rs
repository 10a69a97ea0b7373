use super::domain::{AccessGrant, EvaluationType, SupplierListing};

/// Answers who may evaluate what, and which suppliers a category holds.
#[derive(Debug, Clone, Default)]
pub struct AccessControl {
    grants: Vec<AccessGrant>,
    listings: Vec<SupplierListing>,
}

impl AccessControl {
    pub fn new(grants: Vec<AccessGrant>, listings: Vec<SupplierListing>) -> Self {
        Self { grants, listings }
    }

    fn grants_for<'a>(&'a self, email: &str) -> impl Iterator<Item = &'a AccessGrant> + 'a {
        let wanted = email.trim().to_lowercase();
        self.grants
            .iter()
            .filter(move |grant| grant.email.trim().to_lowercase() == wanted)
    }

    /// Distinct types granted to the user, first-seen order.
    pub fn types_for(&self, email: &str) -> Vec<EvaluationType> {
        let mut types = Vec::new();
        for grant in self.grants_for(email) {
            if !types.contains(&grant.evaluation) {
                types.push(grant.evaluation);
            }
        }
        types
    }

    /// Distinct categories granted for one type, first-seen order.
    pub fn categories_for(&self, email: &str, evaluation: EvaluationType) -> Vec<String> {
        let mut categories: Vec<String> = Vec::new();
        for grant in self
            .grants_for(email)
            .filter(|grant| grant.evaluation == evaluation)
        {
            if !categories.contains(&grant.category) {
                categories.push(grant.category.clone());
            }
        }
        categories
    }

    /// Category matches exactly; e-mail and type ignore case.
    pub fn is_authorized(&self, email: &str, evaluation: EvaluationType, category: &str) -> bool {
        self.grants_for(email)
            .any(|grant| grant.evaluation == evaluation && grant.category == category)
    }

    pub fn suppliers_for(&self, category: &str) -> Vec<String> {
        self.listings
            .iter()
            .filter(|listing| listing.category == category)
            .map(|listing| listing.supplier.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(email: &str, evaluation: EvaluationType, category: &str) -> AccessGrant {
        AccessGrant {
            email: email.to_string(),
            evaluation,
            category: category.to_string(),
        }
    }

    fn listing(category: &str, supplier: &str) -> SupplierListing {
        SupplierListing {
            category: category.to_string(),
            supplier: supplier.to_string(),
        }
    }

    fn access() -> AccessControl {
        AccessControl::new(
            vec![
                grant("A@X.com", EvaluationType::Esg, "CatB"),
                grant("a@x.com", EvaluationType::Commercial, "CatA"),
                grant("a@x.com", EvaluationType::Commercial, "CatC"),
                grant("a@x.com", EvaluationType::Esg, "CatB"),
                grant("b@x.com", EvaluationType::Technical, "CatA"),
            ],
            vec![
                listing("CatA", "Acme"),
                listing("CatB", "Globex"),
                listing("CatA", "Initech"),
            ],
        )
    }

    #[test]
    fn types_are_distinct_in_first_seen_order() {
        assert_eq!(
            access().types_for("a@X.COM"),
            vec![EvaluationType::Esg, EvaluationType::Commercial]
        );
    }

    #[test]
    fn no_grant_means_no_types() {
        assert!(access().types_for("nobody@x.com").is_empty());
        assert!(access().types_for("").is_empty());
    }

    #[test]
    fn categories_filter_by_type() {
        let access = access();
        assert_eq!(
            access.categories_for("a@x.com", EvaluationType::Commercial),
            vec!["CatA".to_string(), "CatC".to_string()]
        );
        assert!(access
            .categories_for("a@x.com", EvaluationType::Technical)
            .is_empty());
    }

    #[test]
    fn authorization_is_case_sensitive_on_category_only() {
        let access = access();
        assert!(access.is_authorized("A@x.COM", EvaluationType::Commercial, "CatA"));
        assert!(!access.is_authorized("a@x.com", EvaluationType::Commercial, "cata"));
        assert!(!access.is_authorized("a@x.com", EvaluationType::Technical, "CatA"));
        assert!(!access.is_authorized("c@x.com", EvaluationType::Commercial, "CatA"));
    }

    #[test]
    fn suppliers_keep_listing_order() {
        assert_eq!(
            access().suppliers_for("CatA"),
            vec!["Acme".to_string(), "Initech".to_string()]
        );
        assert!(access().suppliers_for("CatZ").is_empty());
    }
}
