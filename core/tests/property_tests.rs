//! Property-based tests for templates and coercion.

#![allow(clippy::expect_used)]

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use proptest::prelude::*;
use route_bind_core::timestamp::{Layout, LastSuccessOrder, parse_timestamp};
use route_bind_core::{Coerce, PathPattern};
use route_bind_testing::properties::{
    TemplateSegment, brace_template, colon_template, segment_value, template_segments,
};
use std::time::Duration;

fn params(segments: &[TemplateSegment]) -> Vec<String> {
    segments
        .iter()
        .filter_map(|segment| match segment {
            TemplateSegment::Param(name) => Some(name.clone()),
            TemplateSegment::Literal(_) => None,
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_compile_is_deterministic(segments in template_segments()) {
        let template = colon_template(&segments);
        let first = PathPattern::compile(&template).expect("generated template is valid");
        let second = PathPattern::compile(&template).expect("generated template is valid");
        prop_assert_eq!(first.expression(), second.expression());
        prop_assert_eq!(first.params(), second.params());
        prop_assert_eq!(&first, &second);
    }

    #[test]
    fn prop_notations_are_equivalent(segments in template_segments()) {
        let colon = PathPattern::compile(&colon_template(&segments)).expect("valid");
        let brace = PathPattern::compile(&brace_template(&segments)).expect("valid");
        prop_assert_eq!(colon.params(), brace.params());
        let expected_params = params(&segments);
        prop_assert_eq!(colon.params(), expected_params.as_slice());
        prop_assert_eq!(colon.to_brace_notation(), brace.template());
        prop_assert_eq!(brace.to_colon_notation(), colon.template());
        prop_assert_eq!(colon.expression(), brace.expression());
    }

    #[test]
    fn prop_captures_return_substituted_values(
        segments in template_segments(),
        values in proptest::collection::vec(segment_value(), 6),
    ) {
        let pattern = PathPattern::compile(&colon_template(&segments)).expect("valid");
        let mut path = String::new();
        let mut expected = Vec::new();
        for (segment, value) in segments.iter().zip(&values) {
            path.push('/');
            match segment {
                TemplateSegment::Literal(text) => path.push_str(text),
                TemplateSegment::Param(name) => {
                    path.push_str(value);
                    expected.push((name.clone(), value.clone()));
                }
            }
        }
        let captures = pattern.captures(&path).expect("substituted path matches");
        prop_assert_eq!(captures.len(), expected.len());
        for (name, value) in &expected {
            prop_assert_eq!(captures.get(name), Some(value.as_str()));
        }
        let extended = format!("{path}/extra");
        prop_assert!(!pattern.is_match(&extended));
    }

    #[test]
    fn prop_integers_round_trip(n in any::<i64>(), u in any::<u32>()) {
        prop_assert_eq!(i64::coerce(&n.to_string()).expect("canonical"), n);
        prop_assert_eq!(u32::coerce(&u.to_string()).expect("canonical"), u);
        prop_assert_eq!(u32::coerce(&format!("{u:#x}")).expect("hex"), u);
        prop_assert_eq!(u32::coerce(&format!("{u:#o}")).expect("octal"), u);
        prop_assert_eq!(u32::coerce(&format!("{u:#b}")).expect("binary"), u);
    }

    #[test]
    fn prop_widening_out_of_range_fails(n in (i64::from(i16::MAX) + 1)..i64::MAX) {
        prop_assert!(i16::coerce(&n.to_string()).is_err());
    }

    #[test]
    fn prop_narrow_integers_round_trip(
        a in any::<i8>(),
        b in any::<u8>(),
        c in any::<i16>(),
        d in any::<u16>(),
    ) {
        prop_assert_eq!(i8::coerce(&a.to_string()).expect("canonical"), a);
        prop_assert_eq!(u8::coerce(&b.to_string()).expect("canonical"), b);
        prop_assert_eq!(i16::coerce(&c.to_string()).expect("canonical"), c);
        prop_assert_eq!(u16::coerce(&d.to_string()).expect("canonical"), d);

        let sign = if c < 0 { "-" } else { "" };
        let hex = format!("{sign}{:#x}", c.unsigned_abs());
        prop_assert_eq!(i16::coerce(&hex).expect("signed hex"), c);
        prop_assert_eq!(u8::coerce(&format!("{b:#b}")).expect("binary"), b);
        prop_assert_eq!(u16::coerce(&format!("{d:#o}")).expect("octal"), d);
    }

    #[test]
    fn prop_narrow_integers_reject_wider_values(
        small in (i16::from(i8::MAX) + 1)..=i16::MAX,
        large in (u32::from(u16::MAX) + 1)..=u32::MAX,
    ) {
        prop_assert!(i8::coerce(&small.to_string()).is_err());
        prop_assert!(i8::coerce(&(-small - 1).to_string()).is_err());
        prop_assert!(u8::coerce(&small.to_string()).is_err());
        prop_assert!(u16::coerce(&large.to_string()).is_err());
    }

    #[test]
    fn prop_floats_round_trip(
        wide in any::<f64>().prop_filter("NaN never compares equal", |x| !x.is_nan()),
        narrow in any::<f32>().prop_filter("NaN never compares equal", |x| !x.is_nan()),
    ) {
        let coerced = f64::coerce(&wide.to_string()).expect("canonical");
        prop_assert_eq!(coerced.to_bits(), wide.to_bits());
        let coerced = f32::coerce(&narrow.to_string()).expect("canonical");
        prop_assert_eq!(coerced.to_bits(), narrow.to_bits());
    }

    #[test]
    fn prop_instants_round_trip(secs in 0_i64..4_102_444_800, nanos in 0_u32..1_000_000_000) {
        let instant = Utc.timestamp_opt(secs, nanos).single().expect("timestamp in range");
        let coerced = DateTime::<Utc>::coerce(&instant.to_rfc3339()).expect("rfc3339");
        prop_assert_eq!(coerced, instant);

        let naive = instant.naive_utc();
        let coerced = NaiveDateTime::coerce(&instant.to_rfc3339()).expect("rfc3339");
        prop_assert_eq!(coerced, naive);

        let whole = Utc.timestamp_opt(secs, 0).single().expect("timestamp in range").naive_utc();
        let text = whole.format("%Y-%m-%d %H:%M:%S").to_string();
        prop_assert_eq!(NaiveDateTime::coerce(&text).expect("date-time layout"), whole);
    }

    #[test]
    fn prop_bools_round_trip(b in any::<bool>()) {
        prop_assert_eq!(bool::coerce(&b.to_string()).expect("canonical"), b);
    }

    #[test]
    fn prop_durations_sum_components(
        hours in 0_u64..1000,
        minutes in 0_u64..60,
        seconds in 0_u64..60,
        millis in 0_u64..1000,
    ) {
        let text = format!("{hours}h{minutes}m{seconds}s{millis}ms");
        let expected = Duration::from_secs(hours * 3600 + minutes * 60 + seconds)
            + Duration::from_millis(millis);
        prop_assert_eq!(Duration::coerce(&text).expect("valid duration"), expected);
    }

    #[test]
    fn prop_layout_order_does_not_change_results(
        order in Just(Layout::ALL.to_vec()).prop_shuffle(),
        secs in 0_i64..4_102_444_800,
        offset_minutes in -720_i32..=840,
    ) {
        let offset = FixedOffset::east_opt(offset_minutes * 60).expect("offset in range");
        let instant: DateTime<FixedOffset> = Utc
            .timestamp_opt(secs, 0)
            .single()
            .expect("timestamp in range")
            .with_timezone(&offset);
        let inputs = [
            instant.to_rfc3339(),
            instant.format("%a, %d %b %Y %H:%M:%S %z").to_string(),
            instant.format("%Y-%m-%d").to_string(),
        ];
        let reordered = LastSuccessOrder::new(order);
        for raw in &inputs {
            let expected = parse_timestamp(raw).expect("global order parses");
            let found = reordered.find_map(|layout| layout.parse(raw)).expect("any order parses");
            prop_assert_eq!(found, expected);
        }
    }
}
