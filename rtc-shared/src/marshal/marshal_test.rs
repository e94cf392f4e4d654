use super::*;
use bytes::BufMut;

struct TwoBytes(u16);

impl MarshalSize for TwoBytes {
    fn marshal_size(&self) -> usize {
        2
    }
}

impl Marshal for TwoBytes {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        buf.put_u16(self.0);
        Ok(2)
    }
}

struct Liar;

impl MarshalSize for Liar {
    fn marshal_size(&self) -> usize {
        4
    }
}

impl Marshal for Liar {
    fn marshal_to(&self, _buf: &mut [u8]) -> Result<usize> {
        Ok(1)
    }
}

#[test]
fn test_marshal_allocates_marshal_size() -> Result<()> {
    let raw = TwoBytes(0x0102).marshal()?;
    assert_eq!(&raw[..], &[0x01, 0x02]);
    Ok(())
}

#[test]
fn test_marshal_size_mismatch() {
    let result = Liar.marshal();
    assert!(matches!(result, Err(Error::Other(_))));
}

#[test]
fn test_ensure_remaining() {
    let buf: &[u8] = &[1, 2, 3];
    assert!(ensure_remaining(&buf, 3).is_ok());
    assert_eq!(
        ensure_remaining(&buf, 4),
        Err(Error::UnexpectedEndOfBuffer {
            expected: 4,
            actual: 3
        })
    );
}

#[test]
fn test_copy_to_bytes_checked() -> Result<()> {
    let mut buf: &[u8] = &[1, 2, 3];
    let head = copy_to_bytes_checked(&mut buf, 2)?;
    assert_eq!(&head[..], &[1, 2]);
    assert_eq!(buf, &[3]);
    assert!(copy_to_bytes_checked(&mut buf, 2).is_err());
    Ok(())
}
