//! Performance benchmarks for the reply parser and request encoders

use std::hint::black_box;

use bytes::BytesMut;
use criterion::Criterion;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use resp::BytesFactory;
use resp::Charset;
use resp::CharsetDecoder;
use resp::Encoder;
use resp::RespParseResult;

fn bench_parse(c: &mut Criterion) {
	let mut group = c.benchmark_group("parse");
	let cases: [(&str, &[u8]); 4] = [
		("simple_string", b"+OK\r\n"),
		("bulk_string", b"$11\r\nhello world\r\n"),
		("integer", b":1000\r\n"),
		("array_set_command", b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nvalue\r\n"),
	];

	for (name, data) in cases {
		group.throughput(Throughput::Bytes(data.len() as u64));
		group.bench_function(name, |b| {
			b.iter(|| {
				let mut buf = BytesMut::from(data);
				resp::parse(black_box(&mut buf)).unwrap()
			})
		});
	}
	group.finish();
}

fn bench_parse_large_array(c: &mut Criterion) {
	let mut group = c.benchmark_group("parse_large_array");

	let mut data = BytesMut::from("*100\r\n");
	for i in 0..100 {
		let item = format!("$3\r\n{:03}\r\n", i);
		data.extend_from_slice(item.as_bytes());
	}

	group.throughput(Throughput::Bytes(data.len() as u64));
	group.bench_function("array_100_items", |b| {
		b.iter(|| {
			let mut buf = data.clone();
			resp::parse(black_box(&mut buf)).unwrap()
		})
	});
	group.finish();
}

fn bench_parse_fragmented(c: &mut Criterion) {
	let mut group = c.benchmark_group("parse_fragmented");
	let data = b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nvalue\r\n";

	group.throughput(Throughput::Bytes(data.len() as u64));
	group.bench_function("one_byte_chunks", |b| {
		b.iter(|| {
			let mut parser = resp::array_reply(BytesFactory::new());
			let mut decoder = CharsetDecoder::new(Charset::Utf8);
			let mut buf = BytesMut::new();
			for byte in data.chunks(1) {
				buf.extend_from_slice(byte);
				if let RespParseResult::Complete(reply) = parser.next_reply(&mut buf, &mut decoder) {
					return black_box(reply);
				}
			}
			unreachable!()
		})
	});
	group.finish();
}

fn bench_encode(c: &mut Criterion) {
	let mut group = c.benchmark_group("encode");
	let value = "v".repeat(64);

	group.bench_function("set_command", |b| {
		b.iter(|| {
			let words = ["SET", "key", value.as_str()];
			resp::command_from_words(Charset::Utf8, black_box(words))
				.unwrap()
				.to_bytes()
		})
	});
	group.bench_function("set_command_compacted", |b| {
		b.iter(|| {
			let words = ["SET", "key", value.as_str()];
			resp::command_from_words(Charset::Utf8, black_box(words))
				.unwrap()
				.compact()
				.to_bytes()
		})
	});
	group.bench_function("long_bulk_string", |b| {
		let encoder = resp::long_bulk_string();
		b.iter(|| encoder.encode(black_box(-1_234_567_890i64)).unwrap().to_bytes())
	});
	group.bench_function("utf16_bulk_string", |b| {
		let encoder = resp::str_bulk_string(Charset::Utf16Le);
		b.iter(|| encoder.encode(black_box(value.as_str())).unwrap().to_bytes())
	});
	group.finish();
}

criterion_group!(
	benches,
	bench_parse,
	bench_parse_large_array,
	bench_parse_fragmented,
	bench_encode,
);

criterion_main!(benches);
