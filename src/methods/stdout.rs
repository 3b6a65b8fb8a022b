//! Definition of the Stdout method

use async_trait::async_trait;

use super::{format_payload, Method, MethodError};
use crate::color::DeviceColor;

/// Method that only logs the colors it receives
pub struct Stdout {
    name: String,
}

impl Stdout {
    pub fn new() -> Self {
        Self {
            name: "stdout".to_owned(),
        }
    }
}

impl Default for Stdout {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Method for Stdout {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, color: DeviceColor) -> Result<(), MethodError> {
        info!(
            red = %format_args!("{:3}", color.red),
            green = %format_args!("{:3}", color.green),
            blue = %format_args!("{:3}", color.blue),
            "\x1B[38;2;{};{};{}m█\x1B[0m {}",
            color.red,
            color.green,
            color.blue,
            format_payload(color)
        );

        Ok(())
    }
}
