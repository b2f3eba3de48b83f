use anyhow::Result;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::net::{SocketAddrV4, UdpSocket};

const IP_ALL: [u8; 4] = [0, 0, 0, 0];

/// Anything that takes one encoded frame per call
pub trait MessageSink {
    fn send(&mut self, message: &[u8]) -> std::io::Result<()>;
}

/// Fire and forget datagrams to a single local consumer
pub struct MessageSender {
    socket: UdpSocket,
    destination: SocketAddrV4,
}

fn bind_sender() -> Result<UdpSocket> {
    let socket = Socket::new(Domain::ipv4(), Type::dgram(), Some(Protocol::udp()))?;
    socket.bind(&SockAddr::from(SocketAddrV4::new(IP_ALL.into(), 0)))?;
    Ok(socket.into_udp_socket())
}

impl MessageSender {
    pub fn new(destination: SocketAddrV4) -> Result<Self> {
        assert!(
            destination.ip().is_loopback(),
            "Markers are only relayed on this machine"
        );
        Ok(Self {
            socket: bind_sender()?,
            destination,
        })
    }
}

impl MessageSink for MessageSender {
    fn send(&mut self, message: &[u8]) -> std::io::Result<()> {
        self.socket.send_to(message, self.destination)?;
        Ok(())
    }
}
