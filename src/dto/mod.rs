/// Health check DTOs.
pub mod health;
/// Score endpoint DTOs.
pub mod score;
/// Custom validation helpers.
pub mod validation;
