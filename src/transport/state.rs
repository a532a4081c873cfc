/// Lifecycle of a session socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Disconnected,
    /// Dialing. `attempt` is 0 for the first dial, then counts reconnects.
    Connecting { attempt: u32 },
    Open,
    /// Reconnects exhausted
    Closed,
}

/// Inputs to the socket state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketInput {
    /// Caller asked to connect
    Connect,
    /// The channel finished its handshake
    Opened,
    /// The channel closed unexpectedly or failed to open
    Dropped,
    /// Caller asked to disconnect
    Disconnect,
}

/// What the driver must do after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketAction {
    None,
    /// Spawn the driver and dial
    Dial,
    /// Start the keepalive and deliver messages
    Activate,
    /// Wait the reconnect delay, then dial
    Retry { attempt: u32 },
    /// Report the terminal close
    GiveUp { attempts: u32 },
    /// Stop everything and close the channel
    Shutdown,
}

impl SocketState {
    /// The transition table.
    pub fn transition(self, input: SocketInput, max_attempts: u32) -> (SocketState, SocketAction) {
        use SocketAction as A;
        use SocketInput as I;
        use SocketState as S;

        match (self, input) {
            (S::Disconnected, I::Connect) => (S::Connecting { attempt: 0 }, A::Dial),
            (S::Connecting { .. } | S::Open | S::Closed, I::Connect) => (self, A::None),

            (S::Connecting { .. }, I::Opened) => (S::Open, A::Activate),
            (_, I::Opened) => (self, A::None),

            (S::Connecting { attempt }, I::Dropped) => retry_or_close(attempt, max_attempts),
            (S::Open, I::Dropped) => retry_or_close(0, max_attempts),
            (S::Disconnected | S::Closed, I::Dropped) => (self, A::None),

            (S::Disconnected, I::Disconnect) => (self, A::None),
            (_, I::Disconnect) => (S::Disconnected, A::Shutdown),
        }
    }

    pub fn is_open(self) -> bool {
        self == SocketState::Open
    }
}

fn retry_or_close(attempts_so_far: u32, max_attempts: u32) -> (SocketState, SocketAction) {
    if attempts_so_far < max_attempts {
        let attempt = attempts_so_far + 1;
        (
            SocketState::Connecting { attempt },
            SocketAction::Retry { attempt },
        )
    } else {
        (
            SocketState::Closed,
            SocketAction::GiveUp {
                attempts: attempts_so_far,
            },
        )
    }
}
