pub mod case;
pub mod reward;
pub mod trajectory;
