//! Result type aliases

use crate::error::AppError;

/// Standard Result type for Storefront operations
pub type AppResult<T> = Result<T, AppError>;

/// Extension for turning `Option` lookups into not-found errors
pub trait OptionExt<T> {
    fn or_not_found(self, entity: &'static str, id: impl std::fmt::Display) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, entity: &'static str, id: impl std::fmt::Display) -> AppResult<T> {
        self.ok_or_else(|| AppError::not_found(entity, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_not_found() {
        let found: AppResult<i32> = Some(3).or_not_found("Product", 3);
        assert_eq!(found.ok(), Some(3));

        let missing: AppResult<i32> = None.or_not_found("Product", 9);
        match missing {
            Err(AppError::NotFound { entity, value, .. }) => {
                assert_eq!(entity, "Product");
                assert_eq!(value, "9");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
