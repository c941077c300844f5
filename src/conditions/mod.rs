pub mod models;
pub mod views;

#[cfg(test)]
mod tests;
