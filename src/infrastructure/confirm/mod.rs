//! Terminal confirmation

mod interactive;

pub use interactive::{render_prompt_details, DialoguerConfirmer};
