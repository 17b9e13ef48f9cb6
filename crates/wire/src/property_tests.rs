// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frame round-trip properties.

use crate::{decode, encode, Request, Response};
use proptest::prelude::*;

fn request_strategy() -> impl Strategy<Value = Request> {
    prop_oneof![
        Just(Request::Ping),
        Just(Request::Status),
        Just(Request::ListDefs),
        "[a-z0-9-]{1,19}".prop_map(|s| Request::Pull {
            id: wonder_core::DefId::from_string(format!("def-{s}")),
            version: None,
        }),
        (any::<u32>(), "[a-z0-9-]{1,19}").prop_map(|(v, s)| Request::Pull {
            id: wonder_core::DefId::from_string(format!("def-{s}")),
            version: Some(v),
        }),
        ".{0,64}".prop_map(|version| Request::Hello { version }),
    ]
}

fn response_strategy() -> impl Strategy<Value = Response> {
    prop_oneof![
        Just(Response::Ok),
        Just(Response::Pong),
        ".{0,64}".prop_map(|message| Response::Error { message }),
        (any::<u64>(), any::<usize>()).prop_map(|(uptime_secs, defs)| Response::Status {
            uptime_secs,
            defs,
            runs: vec![],
        }),
    ]
}

proptest! {
    #[test]
    fn request_frames_round_trip(request in request_strategy()) {
        let frame = encode(&request).unwrap();
        let decoded: Request = decode(&frame[4..]).unwrap();
        prop_assert_eq!(decoded, request);
    }

    #[test]
    fn response_frames_round_trip(response in response_strategy()) {
        let frame = encode(&response).unwrap();
        let decoded: Response = decode(&frame[4..]).unwrap();
        prop_assert_eq!(decoded, response);
    }

    #[test]
    fn length_prefix_always_matches(request in request_strategy()) {
        let frame = encode(&request).unwrap();
        let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        prop_assert_eq!(len, frame.len() - 4);
    }
}
