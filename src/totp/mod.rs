pub mod base32;
mod engine;

pub use engine::{
    compute_code, current_code, generate_secret, time_remaining, verify_code, verify_code_at,
    TotpError, CODE_DIGITS, SECRET_BYTES, STEP_SECONDS,
};
