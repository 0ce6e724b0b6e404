//! The connection adapter seam.
//!
//! Transfers run over any transport that can present itself as an ordered,
//! reliable, message-oriented channel keyed by a peer identifier. The
//! protocol carries no sequence numbers: the [`PeerChannel`] contract below
//! is load-bearing, and a transport that cannot honor it must not implement
//! the trait.
//!
//! [`memory`] provides the reference adapter: an in-process hub that
//! assigns identifiers and relays frames between registered endpoints.

pub mod memory;

use crate::error::Result;
use crate::identity::PeerId;
use crate::protocol::Message;

/// An ordered, reliable, bidirectional message link to one peer.
///
/// Contract for implementors:
///
/// - messages arrive in send order, exactly once — no loss, duplication,
///   or reordering;
/// - `send` exerts backpressure: it completes only once the transport has
///   accepted the message, and suspends while transport buffers are full;
/// - after `recv` returns `Ok(None)` or an error, the channel is dead and
///   every later call must report the same.
pub trait PeerChannel {
    /// Send one message to the peer.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport can no longer deliver.
    async fn send(&mut self, message: Message) -> Result<()>;

    /// Receive the next message.
    ///
    /// `Ok(None)` means the peer closed the channel in an orderly way.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport failed or delivered garbage.
    async fn recv(&mut self) -> Result<Option<Message>>;
}

/// Establishes channels to remote peers by identifier.
pub trait Connector {
    /// The channel type this connector produces.
    type Channel: PeerChannel;

    /// Open a channel to the peer registered under `remote`.
    ///
    /// # Errors
    ///
    /// Returns an error if the peer is unknown or the channel cannot be
    /// established.
    async fn connect(&self, remote: &PeerId) -> Result<Self::Channel>;
}
