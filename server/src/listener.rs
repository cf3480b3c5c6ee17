use std::{io, net::SocketAddr, sync::Arc};

use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{error, info, instrument, warn};

use crate::{logic::Board, players::Players, session::Session};

/// Accepts players and runs one session task per connection.
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    pub async fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        Ok(Self {
            inner: TcpListener::bind(addr).await?,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Only returns if accepting fails; errors from single connections stay
    /// inside their session task.
    #[instrument(level = "trace", skip_all)]
    pub async fn serve(
        self,
        board: Arc<Board>,
        players: Arc<Players>,
        debug: bool,
    ) -> io::Result<()> {
        loop {
            let (stream, peer) = match self.inner.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    error!("Failed to accept connection: {}", err);
                    return Err(err);
                }
            };

            let session = Session::new(Arc::clone(&board), players.join(), debug);
            let id = session.id();
            info!(
                "Player {} connected from {} ({} playing)",
                id,
                peer,
                players.count()
            );

            let remaining = Arc::clone(&players);
            tokio::spawn(async move {
                match session.run(stream).await {
                    Ok(end) => info!("Player {} left: {:?}", id, end),
                    Err(err) => warn!("Connection error for player {}: {}", id, err),
                }
                // The slot is released once `run` returns.
                info!("{} players remaining", remaining.count());
            });
        }
    }
}
