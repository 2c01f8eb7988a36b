//! Codec tests for echolite core

use echolite_core::property::{GET_MAP, IDENTIFICATION_NUMBER, MANUFACTURER_CODE};
use echolite_core::{
    codec, DecoderTable, EchonetObject, Error, Frame, Identification, Property, PropertyValue,
    ServiceCode, INSTANCE_LIST,
};

fn aircon() -> EchonetObject {
    EchonetObject::new(0x01, 0x30, 0x01)
}

#[test]
fn test_discovery_response_layout() {
    // Instance list: two objects
    let edt = vec![2, 0x01, 0x30, 0x01, 0x02, 0x88, 0x01];
    let frame = Frame::new(EchonetObject::controller(), ServiceCode::GetResponse)
        .with_source(EchonetObject::new(0x0E, 0xF0, 0x01))
        .with_tid(0x0042)
        .with_property(Property::new(INSTANCE_LIST, edt.clone()));

    let encoded = codec::encode(&frame).expect("encode failed");
    assert_eq!(encoded.len(), 12 + 2 + edt.len());
    assert_eq!(&encoded[2..4], &[0x00, 0x42]);
    assert_eq!(encoded[10], 0x72);

    let decoded = codec::decode(&encoded).expect("decode failed");
    assert!(decoded.seoj.is_node_profile());
    assert_eq!(decoded.properties[0].epc, INSTANCE_LIST);
    assert_eq!(decoded.properties[0].edt.as_ref(), edt.as_slice());
}

#[test]
fn test_get_request_has_no_data() {
    let frame = Frame::new(aircon(), ServiceCode::Get)
        .with_tid(1)
        .with_properties([0x80, 0xB0].into_iter().map(Property::request));

    let encoded = codec::encode(&frame).expect("encode failed");
    assert_eq!(&encoded[11..], &[0x02, 0x80, 0x00, 0xB0, 0x00]);

    let decoded = codec::decode(&encoded).expect("decode failed");
    assert!(decoded.properties.iter().all(|p| !p.has_data()));
    assert_eq!(decoded.service(), Some(ServiceCode::Get));
}

#[test]
fn test_unknown_service_code_is_kept_raw() {
    let bytes = [
        0x10, 0x81, 0x00, 0x09, 0x01, 0x30, 0x01, 0x05, 0xFF, 0x01, 0x99, 0x00,
    ];
    let decoded = codec::decode(&bytes).expect("decode failed");
    assert_eq!(decoded.esv, 0x99);
    assert_eq!(decoded.service(), None);
    assert!(decoded.properties.is_empty());
}

#[test]
fn test_too_many_properties() {
    let frame = Frame::new(aircon(), ServiceCode::Get)
        .with_properties((0..300u32).map(|i| Property::request(i as u8)));
    assert_eq!(codec::encode(&frame), Err(Error::TooManyProperties(300)));
}

#[test]
fn test_default_decoders_on_wire_data() {
    let table = DecoderTable::default();

    let get_map = table.get(GET_MAP).expect("get map decoder");
    let value = get_map(&[2, 0x80, 0xB0]).expect("decode failed");
    assert_eq!(
        value.as_map().map(|codes| codes.len()),
        Some(2),
        "get map should hold two codes"
    );

    let manufacturer = table.get(MANUFACTURER_CODE).expect("manufacturer decoder");
    assert_eq!(
        manufacturer(&[0x00, 0x00, 0x05]).expect("decode failed"),
        PropertyValue::Identification(Identification::Manufacturer(5))
    );

    let uid = table.get(IDENTIFICATION_NUMBER).expect("uid decoder");
    assert!(matches!(
        uid(&[0xFE, 0x01]).expect("decode failed"),
        PropertyValue::Identification(Identification::DeviceId(ref id)) if id == "fe01"
    ));
}

#[test]
fn test_property_value_serializes() {
    let value = PropertyValue::Identification(Identification::Manufacturer(0x77));
    let json = serde_json::to_string(&value).expect("serialize failed");
    assert_eq!(json, r#"{"identification":{"manufacturer":119}}"#);
}
