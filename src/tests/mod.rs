mod common;

mod send_message;
mod transport;
