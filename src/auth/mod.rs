pub mod flows;
pub mod password;
pub mod secrets;
