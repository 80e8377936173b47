pub(crate) mod room_event;
pub(crate) mod room_token;
pub(crate) mod webhook;

pub(crate) async fn healthz() -> &'static str {
    "Ok"
}
