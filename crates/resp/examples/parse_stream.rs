use bytes::BytesMut;
use resp::BytesFactory;
use resp::Charset;
use resp::CharsetDecoder;
use resp::RespParseResult;

fn main() {
	println!("--- RESP Streaming Parse Example ---");

	// Replies as a socket might deliver them:
	// - A Simple String: "+OK\r\n"
	// - An Integer: ":1000\r\n"
	// - An Error: "-ERR unknown\r\n"
	// - An Array: "*2\r\n$3\r\nfoo\r\n$-1\r\n"
	let data_chunks = [
		b"+O".as_slice(),
		b"K\r\n:1".as_slice(),
		b"00".as_slice(),
		b"0\r\n-ERR unk".as_slice(),
		b"nown\r\n*2\r\n$3\r\nf".as_slice(),
		b"oo\r\n$-1\r\n".as_slice(),
	];

	let mut parser = resp::any_reply(BytesFactory::new());
	let mut decoder = CharsetDecoder::new(Charset::Utf8);
	let mut buffer = BytesMut::new();

	for (i, chunk) in data_chunks.iter().enumerate() {
		println!("\n[Stream] Received Chunk {}: {:?}", i, String::from_utf8_lossy(chunk));

		buffer.extend_from_slice(chunk);

		loop {
			match parser.next_reply(&mut buffer, &mut decoder) {
				RespParseResult::Complete(Ok(value)) => {
					println!("[Parser] Complete: {:?}", value);
				}
				RespParseResult::Complete(Err(e)) => {
					println!("[Parser] Server error: {}", e);
				}
				RespParseResult::Incomplete => {
					println!("[Parser] Incomplete, waiting for more data...");
					break;
				}
				RespParseResult::Error(e) => {
					eprintln!("[Parser] Error: {:?}", e);
					break;
				}
			}
		}
	}
}
