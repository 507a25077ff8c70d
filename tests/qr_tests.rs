fn decode(img: &image::GrayImage) -> (usize, String) {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(w, h, |x, y| img.get_pixel(x as u32, y as u32).0[0]);
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1, "Expected exactly one symbol");
    let (meta, decoded) = grids[0].decode().expect("Failed to read QR");
    (meta.version.0, decoded)
}

#[cfg(test)]
mod qr_proptests {
    use prop::string::string_regex;
    use proptest::prelude::*;

    use qrbox::{ECLevel, QRBuilder};

    use super::decode;

    pub fn ec_level_strategy() -> BoxedStrategy<ECLevel> {
        prop_oneof![Just(ECLevel::L), Just(ECLevel::M), Just(ECLevel::Q), Just(ECLevel::H)].boxed()
    }

    pub fn qr_strategy(regex: &'static str, max_len: usize) -> impl Strategy<Value = (ECLevel, String)> {
        ec_level_strategy().prop_flat_map(move |ecl| {
            let pattern = format!(r"{regex}{{1,{max_len}}}");
            string_regex(&pattern).unwrap().prop_map(move |data| (ecl, data))
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn proptest_numeric(params in qr_strategy("[0-9]", 600)) {
            let (ecl, data) = params;
            let qr = QRBuilder::new(data.as_bytes()).ec_level(ecl).build().unwrap();
            let (ver, decoded) = decode(&qr.render(3, 4).unwrap());
            prop_assert_eq!(ver, *qr.version());
            prop_assert_eq!(data, decoded);
        }

        #[test]
        fn proptest_alphanumeric(params in qr_strategy(r"[0-9A-Z $%*+\-./:]", 400)) {
            let (ecl, data) = params;
            let qr = QRBuilder::new(data.as_bytes()).ec_level(ecl).build().unwrap();
            let (_, decoded) = decode(&qr.render(3, 4).unwrap());
            prop_assert_eq!(data, decoded);
        }

        #[test]
        fn proptest_imei_lists(ids in prop::collection::vec("[0-9]{15}", 1..50)) {
            let payload = ids.join("\n");
            let qr = QRBuilder::new(payload.as_bytes()).build().unwrap();
            let (_, decoded) = decode(&qr.render(3, 4).unwrap());
            prop_assert_eq!(decoded.lines().collect::<Vec<_>>(), ids.iter().map(String::as_str).collect::<Vec<_>>());
        }
    }
}

#[cfg(test)]
mod qr_tests {
    use test_case::test_case;

    use qrbox::{ECLevel, MaskPattern, QRBuilder, QRError};

    use super::decode;

    #[test_case("356938035643809".to_string(), ECLevel::L; "single imei")]
    #[test_case("356938035643809\n490154203237518".to_string(), ECLevel::M; "two imeis")]
    #[test_case("356938035643809\n".repeat(50).trim_end().to_string(), ECLevel::M; "full box")]
    #[test_case("Box_12 Qty: 50 Último".to_string(), ECLevel::Q; "utf8 bytes")]
    #[test_case("CX-01:490154203237518".to_string(), ECLevel::H; "alphanumeric")]
    fn test_qr(data: String, ecl: ECLevel) {
        let qr = QRBuilder::new(data.as_bytes()).ec_level(ecl).build().unwrap();
        let (ver, decoded) = decode(&qr.render(4, 4).unwrap());
        assert_eq!(ver, *qr.version());
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_fixed_mask() {
        let data = "490154203237518";
        for m in 0..8 {
            let qr = QRBuilder::new(data.as_bytes()).mask(MaskPattern::new(m)).build().unwrap();
            assert_eq!(qr.mask(), Some(MaskPattern::new(m)));
            assert_eq!(decode(&qr.render(3, 4).unwrap()).1, data);
        }
    }

    #[test]
    fn test_too_long() {
        let data = "A".repeat(5000);
        let res = QRBuilder::new(data.as_bytes()).ec_level(ECLevel::H).build();
        assert!(matches!(res, Err(QRError::DataTooLong)));
    }
}
