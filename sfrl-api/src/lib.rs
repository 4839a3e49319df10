pub mod builders;
pub mod finetune;
pub mod variant;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
