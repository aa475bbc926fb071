//! Packet type codes.
//!
//! `EXEC_COMMAND` and `AUTH_RESPONSE` share the value 2; which one a frame
//! carries depends on who sent it.

/// Server → client: command output (one fragment of it).
pub const RESPONSE_VALUE: i32 = 0;

/// Client → server: run a command.
pub const EXEC_COMMAND: i32 = 2;

/// Server → client: outcome of an authentication request.
pub const AUTH_RESPONSE: i32 = 2;

/// Client → server: authenticate with the remote-console password.
pub const AUTH: i32 = 3;

/// Request id the server answers with when the password is wrong.
pub const AUTH_FAILURE_ID: i32 = -1;

/// Which side produced a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

/// Returns a human-readable name for a packet type as seen in `direction`.
pub fn packet_type_name(packet_type: i32, direction: Direction) -> &'static str {
    match (direction, packet_type) {
        (Direction::ClientToServer, AUTH) => "AUTH",
        (Direction::ClientToServer, EXEC_COMMAND) => "EXEC_COMMAND",
        (Direction::ServerToClient, AUTH_RESPONSE) => "AUTH_RESPONSE",
        (_, RESPONSE_VALUE) => "RESPONSE_VALUE",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_value_named_by_direction() {
        assert_eq!(
            packet_type_name(2, Direction::ClientToServer),
            "EXEC_COMMAND"
        );
        assert_eq!(
            packet_type_name(2, Direction::ServerToClient),
            "AUTH_RESPONSE"
        );
        assert_eq!(packet_type_name(3, Direction::ClientToServer), "AUTH");
        assert_eq!(packet_type_name(3, Direction::ServerToClient), "UNKNOWN");
        assert_eq!(
            packet_type_name(0, Direction::ServerToClient),
            "RESPONSE_VALUE"
        );
    }
}
