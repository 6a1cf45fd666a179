use msgpack_lite::{
    decode, encode, DecodeLimits, DecodeOptions, EncodeOptions, ErrorCategory, LengthKind,
    MsgPackError, Value,
};

fn nested_arrays(depth: usize) -> Value {
    let mut value = Value::Array(vec![]);
    for _ in 1..depth {
        value = Value::Array(vec![value]);
    }
    value
}

#[test]
fn array_limit_rejects_prefix_before_payload() {
    let options = DecodeOptions::default().with_max_array_length(10);
    // array16 declaring 11 elements, with no elements present
    let err = decode(&[0xdc, 0x00, 0x0b], &options).unwrap_err();
    assert_eq!(
        err,
        MsgPackError::LengthExceeded {
            kind: LengthKind::Array,
            length: 11,
            max: 10
        }
    );
    assert_eq!(err.category(), ErrorCategory::Range);

    let ten = encode(
        &Value::Array(vec![Value::Nil; 10]),
        &EncodeOptions::default(),
    )
    .unwrap();
    assert_eq!(decode(&ten, &options).unwrap().as_array().unwrap().len(), 10);
}

#[test]
fn per_category_limits_matrix() {
    let cases: [(DecodeOptions, &[u8], LengthKind, usize); 8] = [
        (
            DecodeOptions::default().with_max_str_length(3),
            &[0xa4, b'a', b'b', b'c', b'd'],
            LengthKind::Str,
            4,
        ),
        (
            DecodeOptions::default().with_max_str_length(3),
            &[0xd9, 0xff],
            LengthKind::Str,
            255,
        ),
        (
            DecodeOptions::default().with_max_bin_length(1),
            &[0xc4, 0x02, 0x00, 0x00],
            LengthKind::Bin,
            2,
        ),
        (
            DecodeOptions::default().with_max_bin_length(0),
            &[0xc6, 0x00, 0x01, 0x00, 0x00],
            LengthKind::Bin,
            65_536,
        ),
        (
            DecodeOptions::default().with_max_map_length(1),
            &[0x82, 0xa1, b'a', 0x01, 0xa1, b'b', 0x02],
            LengthKind::Map,
            2,
        ),
        (
            DecodeOptions::default().with_max_map_length(1),
            &[0xdf, 0x00, 0x00, 0x01, 0x00],
            LengthKind::Map,
            256,
        ),
        (
            DecodeOptions::default().with_max_ext_length(2),
            &[0xd6, 0x05, 0, 0, 0, 0],
            LengthKind::Ext,
            4,
        ),
        (
            DecodeOptions::default().with_max_ext_length(2),
            &[0xc7, 0x03, 0x05, 0, 0, 0],
            LengthKind::Ext,
            3,
        ),
    ];
    for (options, bytes, kind, length) in cases {
        match decode(bytes, &options) {
            Err(MsgPackError::LengthExceeded {
                kind: k,
                length: l,
                ..
            }) => {
                assert_eq!((k, l), (kind, length), "bytes {bytes:02x?}");
            }
            other => panic!("bytes {bytes:02x?}: expected length error, got {other:?}"),
        }
    }
}

#[test]
fn map_key_strings_are_limited() {
    let options = DecodeOptions::default().with_max_str_length(2);
    let bytes = [0x81, 0xa3, b'k', b'e', b'y', 0x01];
    assert!(matches!(
        decode(&bytes, &options),
        Err(MsgPackError::LengthExceeded {
            kind: LengthKind::Str,
            length: 3,
            max: 2
        })
    ));
}

#[test]
fn limits_nested_inside_containers() {
    let options = DecodeOptions::default().with_max_array_length(2);
    // [[1, 2, 3]]
    let bytes = [0x91, 0x93, 0x01, 0x02, 0x03];
    assert!(matches!(
        decode(&bytes, &options),
        Err(MsgPackError::LengthExceeded {
            kind: LengthKind::Array,
            ..
        })
    ));
}

#[test]
fn huge_prefix_on_tiny_input_fails_without_allocating() {
    let defaults = DecodeOptions::default();
    assert_eq!(
        decode(&[0xdd, 0xff, 0xff, 0xff, 0xff], &defaults),
        Err(MsgPackError::UnexpectedEof { offset: 5 })
    );
    assert_eq!(
        decode(&[0xdf, 0xff, 0xff, 0xff, 0xff, 0xa0], &defaults),
        Err(MsgPackError::UnexpectedEof { offset: 6 })
    );
    assert_eq!(
        decode(&[0xc6, 0xff, 0xff, 0xff, 0xff, 0x00], &defaults),
        Err(MsgPackError::UnexpectedEof { offset: 5 })
    );
    assert_eq!(
        decode(&[0xdb, 0xff, 0xff, 0xff, 0xff], &defaults),
        Err(MsgPackError::UnexpectedEof { offset: 5 })
    );
}

#[test]
fn limits_from_config() {
    let limits: DecodeLimits = serde_json::from_value(serde_json::json!({
        "max_array_length": 1,
    }))
    .unwrap();
    let options = DecodeOptions::default().with_limits(limits);
    assert!(decode(&[0x91, 0x01], &options).is_ok());
    assert!(decode(&[0x92, 0x01, 0x02], &options).is_err());
    assert!(decode(&[0xa5, b'h', b'e', b'l', b'l', b'o'], &options).is_ok());
}

#[test]
fn depth_limit_matrix() {
    let options = EncodeOptions::default().with_max_depth(3);
    assert!(encode(&nested_arrays(3), &options).is_ok());
    assert_eq!(
        encode(&nested_arrays(4), &options),
        Err(MsgPackError::DepthExceeded { depth: 4, max: 3 })
    );

    // scalars do not count as a level
    let leaf = Value::Array(vec![Value::Array(vec![Value::Array(vec![Value::Int(1)])])]);
    assert!(encode(&leaf, &options).is_ok());

    let record: Value = [("a", [("b", Value::Array(vec![]))]
        .into_iter()
        .collect::<Value>())]
    .into_iter()
    .collect();
    assert!(encode(&record, &options).is_ok());
    assert!(encode(&record, &EncodeOptions::default().with_max_depth(2)).is_err());
}

#[test]
fn default_depth_is_one_hundred() {
    let defaults = EncodeOptions::default();
    assert!(encode(&nested_arrays(100), &defaults).is_ok());
    let err = encode(&nested_arrays(101), &defaults).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Depth);
}

#[test]
fn depth_limit_allows_top_level_scalars() {
    let options = EncodeOptions::default().with_max_depth(0);
    assert_eq!(encode(&Value::Int(1), &options).unwrap(), vec![0x01]);
    assert!(encode(&Value::Array(vec![]), &options).is_err());
}
