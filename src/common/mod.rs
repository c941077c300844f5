pub mod errors;
pub mod list;
pub mod models;
pub mod state;
pub mod validation;
pub mod views;

#[cfg(test)]
pub mod test_helpers;
