//! ECHONET Lite binary codec
//!
//! Encodes [`Frame`]s to datagrams and decodes received datagrams.

use crate::frame::{Frame, EHD1, EHD2_SPECIFIED, HEADER_SIZE};
use crate::types::{EchonetObject, Property, ServiceCode};
use crate::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Encode a frame into a datagram
pub fn encode(frame: &Frame) -> Result<Bytes> {
    if frame.properties.len() > u8::MAX as usize {
        return Err(Error::TooManyProperties(frame.properties.len()));
    }

    let mut buf = BytesMut::with_capacity(frame.size());
    buf.put_u8(EHD1);
    buf.put_u8(EHD2_SPECIFIED);
    buf.put_u16(frame.tid);
    buf.put_slice(&frame.seoj.to_bytes());
    buf.put_slice(&frame.deoj.to_bytes());
    buf.put_u8(frame.esv);
    buf.put_u8(frame.properties.len() as u8);

    for property in &frame.properties {
        if property.edt.len() > u8::MAX as usize {
            return Err(Error::PropertyTooLarge {
                epc: property.epc,
                len: property.edt.len(),
            });
        }
        buf.put_u8(property.epc);
        buf.put_u8(property.edt.len() as u8);
        buf.put_slice(&property.edt);
    }

    Ok(buf.freeze())
}

/// Decode a received datagram
pub fn decode(bytes: &[u8]) -> Result<Frame> {
    if bytes.len() < HEADER_SIZE {
        return Err(Error::BufferTooSmall {
            needed: HEADER_SIZE,
            have: bytes.len(),
        });
    }

    let mut buf = bytes;
    let ehd1 = buf.get_u8();
    if ehd1 != EHD1 {
        return Err(Error::InvalidHeader(ehd1));
    }
    let ehd2 = buf.get_u8();
    if ehd2 != EHD2_SPECIFIED {
        return Err(Error::UnsupportedFormat(ehd2));
    }

    let tid = buf.get_u16();
    let seoj = read_object(&mut buf);
    let deoj = read_object(&mut buf);
    let esv = buf.get_u8();

    if ServiceCode::from_u8(esv).is_some_and(ServiceCode::has_split_lists) {
        return Err(Error::UnsupportedService(esv));
    }

    let opc = buf.get_u8() as usize;
    let mut properties = Vec::with_capacity(opc);

    for _ in 0..opc {
        if buf.remaining() < 2 {
            return Err(Error::Truncated {
                what: "property header",
                needed: 2,
                have: buf.remaining(),
            });
        }
        let epc = buf.get_u8();
        let pdc = buf.get_u8() as usize;
        if buf.remaining() < pdc {
            return Err(Error::Truncated {
                what: "property data",
                needed: pdc,
                have: buf.remaining(),
            });
        }
        let edt = Bytes::copy_from_slice(&buf[..pdc]);
        buf.advance(pdc);
        properties.push(Property { epc, edt });
    }

    Ok(Frame {
        tid,
        seoj,
        deoj,
        esv,
        properties,
    })
}

fn read_object(buf: &mut &[u8]) -> EchonetObject {
    let group = buf.get_u8();
    let class = buf.get_u8();
    let instance = buf.get_u8();
    EchonetObject::new(group, class, instance)
}
