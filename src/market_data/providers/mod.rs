pub mod tesouro;
pub mod yahoo;
