use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

/// Live player counter shared by the listener and every session.
#[derive(Debug, Default)]
pub struct Players {
    live: AtomicUsize,
}

impl Players {
    /// Registers a new player. The count drops again when the slot is dropped.
    pub fn join(self: &Arc<Self>) -> PlayerSlot {
        self.live.fetch_add(1, Ordering::SeqCst);
        PlayerSlot {
            players: Arc::clone(self),
        }
    }

    pub fn count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct PlayerSlot {
    players: Arc<Players>,
}

impl PlayerSlot {
    pub fn players(&self) -> &Players {
        &self.players
    }
}

impl Drop for PlayerSlot {
    fn drop(&mut self) {
        self.players.live.fetch_sub(1, Ordering::SeqCst);
    }
}
