//! The two collaborators the arbiter needs from the device: a half-duplex
//! byte transport and a free running microsecond clock.

use core::fmt::Debug;
use core::ops::{Deref, DerefMut};

/// Driver direction of a half-duplex bus transceiver.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Transmit,
    Receive,
}

/// Byte source/sink on the shared bus.
pub trait Transport {
    type Error: Debug;

    /// Returns the next received byte, if one is available. Must not block.
    fn read_byte(&mut self) -> Option<u8>;

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Block until all written data has left the transmitter.
    fn flush(&mut self) -> Result<(), Self::Error>;

    fn set_direction(&mut self, direction: Direction);
}

/// Monotonic microsecond time source. The counter is allowed to wrap.
pub trait Clock {
    fn now_micros(&mut self) -> u32;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn read_byte(&mut self) -> Option<u8> {
        (**self).read_byte()
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        (**self).write_all(data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        (**self).flush()
    }

    fn set_direction(&mut self, direction: Direction) {
        (**self).set_direction(direction)
    }
}

impl<C: Clock + ?Sized> Clock for &mut C {
    fn now_micros(&mut self) -> u32 {
        (**self).now_micros()
    }
}

/// Holds the transport in transmit mode, and switches it back to receive
/// when dropped, whichever way the transmission ends.
pub struct TransmitGuard<'a, T: Transport> {
    transport: &'a mut T,
}

impl<'a, T: Transport> TransmitGuard<'a, T> {
    pub fn new(transport: &'a mut T) -> Self {
        transport.set_direction(Direction::Transmit);
        Self { transport }
    }
}

impl<T: Transport> Deref for TransmitGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.transport
    }
}

impl<T: Transport> DerefMut for TransmitGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.transport
    }
}

impl<T: Transport> Drop for TransmitGuard<'_, T> {
    fn drop(&mut self) {
        self.transport.set_direction(Direction::Receive);
    }
}

/// Adaptors for `std::io` serial ports.
#[cfg(feature = "std")]
pub mod io {
    use std::io::{ErrorKind, Read, Write};
    use std::time::Instant;

    use log::warn;

    use super::{Clock, Direction, Transport};

    /// [`Transport`] over any `Read + Write` stream, typically a serial port
    /// opened with a short read timeout.
    ///
    /// `set_direction` is called whenever the driver must be enabled or disabled,
    /// for example by toggling the RTS line wired to the RS-485 driver enable pin.
    #[derive(Debug)]
    pub struct IoTransport<IO, F> {
        io: IO,
        set_direction: F,
    }

    impl<IO> IoTransport<IO, fn(Direction)>
    where
        IO: Read + Write,
    {
        /// Use a stream whose transceiver switches direction by itself.
        pub fn auto_direction(io: IO) -> Self {
            Self {
                io,
                set_direction: |_| (),
            }
        }
    }

    impl<IO, F> IoTransport<IO, F>
    where
        IO: Read + Write,
        F: FnMut(Direction),
    {
        pub fn new(io: IO, set_direction: F) -> Self {
            Self { io, set_direction }
        }

        pub fn get_ref(&self) -> &IO {
            &self.io
        }

        pub fn get_mut(&mut self) -> &mut IO {
            &mut self.io
        }

        pub fn into_inner(self) -> IO {
            self.io
        }
    }

    impl<IO, F> Transport for IoTransport<IO, F>
    where
        IO: Read + Write,
        F: FnMut(Direction),
    {
        type Error = std::io::Error;

        fn read_byte(&mut self) -> Option<u8> {
            let mut buf = [0; 1];
            match self.io.read(&mut buf) {
                Ok(1) => Some(buf[0]),
                Ok(_) => None,
                Err(err) => {
                    match err.kind() {
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted => (),
                        _ => warn!("Serial read failed: {}", err),
                    }
                    None
                }
            }
        }

        fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
            self.io.write_all(data)
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            self.io.flush()
        }

        fn set_direction(&mut self, direction: Direction) {
            (self.set_direction)(direction)
        }
    }

    /// [`Clock`] counting microseconds since it was created.
    #[derive(Debug, Copy, Clone)]
    pub struct StdClock {
        start: Instant,
    }

    impl StdClock {
        pub fn new() -> Self {
            Self {
                start: Instant::now(),
            }
        }
    }

    impl Default for StdClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for StdClock {
        fn now_micros(&mut self) -> u32 {
            // truncation gives the same wrapping counter a hardware timer has
            self.start.elapsed().as_micros() as u32
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::io::Cursor;

        #[test]
        fn test_io_transport() {
            let mut dirs = Vec::new();
            {
                let mut t = IoTransport::new(Cursor::new(b"ab".to_vec()), |d| dirs.push(d));
                assert_eq!(t.read_byte(), Some(b'a'));
                assert_eq!(t.read_byte(), Some(b'b'));
                assert_eq!(t.read_byte(), None);
                t.set_direction(Direction::Transmit);
                t.write_all(b"cd").unwrap();
                t.set_direction(Direction::Receive);
                assert_eq!(&t.get_ref().get_ref()[..], b"abcd");
            }
            assert_eq!(dirs, vec![Direction::Transmit, Direction::Receive]);
        }

        #[test]
        fn test_std_clock() {
            let mut clock = StdClock::new();
            let a = clock.now_micros();
            std::thread::sleep(std::time::Duration::from_millis(2));
            assert!(clock.now_micros().wrapping_sub(a) >= 2000);
        }
    }
}
