pub mod request;
pub mod response;

pub use request::*;
pub use response::*;

use serde::{Deserialize, Serialize};
use bincode::{deserialize, serialize, ErrorKind};
use tokio_tungstenite::tungstenite::Message;

/// Wire codec: every request/response enum travels as a bincode-encoded
/// binary websocket frame.
pub trait BinCodeMessage<'a>: Serialize + Deserialize<'a> + Sized {
    fn deser(bin: &'a [u8]) -> Result<Self, Box<ErrorKind>> {
        deserialize::<Self>(bin)
    }

    fn ser(&self) -> Result<Message, Box<ErrorKind>> {
        let bin = serialize(&self)?;
        Ok(Message::Binary(bin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_roundtrips_through_frame() {
        let req = ClientRequest::SubmitGuess {
            guess: "a cat with wings".to_string(),
        };
        let Message::Binary(bin) = req.ser().unwrap() else {
            panic!("expected a binary frame");
        };
        assert_eq!(ClientRequest::deser(&bin).unwrap(), req);
    }

    #[test]
    fn response_roundtrips_through_frame() {
        let event = ServerEvent::YourTurnGuess {
            image: vec![1, 2, 3],
            drawing_index: 4,
        };
        let Message::Binary(bin) = event.ser().unwrap() else {
            panic!("expected a binary frame");
        };
        match ServerEvent::deser(&bin).unwrap() {
            ServerEvent::YourTurnGuess {
                image,
                drawing_index,
            } => {
                assert_eq!(image, vec![1, 2, 3]);
                assert_eq!(drawing_index, 4);
            }
            other => panic!("decoded the wrong variant: {other:?}"),
        }
    }
}
