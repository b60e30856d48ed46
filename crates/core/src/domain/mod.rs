pub mod answer;
pub mod deal;
pub mod question;
pub mod quotation;
