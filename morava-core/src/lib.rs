pub mod message;

pub mod proto {
    include!("proto/morava.rs");
}
