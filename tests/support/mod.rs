use std::{
    io::{BufRead, BufReader, Write},
    net::{TcpListener, TcpStream},
    process::{Command, Output},
    thread::{self, JoinHandle},
    time::Duration,
};

#[allow(dead_code)]
pub fn reserve_port(host: &str) -> u16 {
    let addr = format!("{host}:0");
    let listener = TcpListener::bind(&addr).expect("bind ephemeral port");
    listener.local_addr().unwrap().port()
}

/// Accept one client and hand the stream to `f` on a background thread.
#[allow(dead_code)]
pub fn spawn_peer<T, F>(f: F) -> (String, JoinHandle<T>)
where
    T: Send + 'static,
    F: FnOnce(TcpStream) -> T + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind peer");
    let addr = listener.local_addr().unwrap().to_string();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept client");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        f(stream)
    });

    (addr, handle)
}

/// A tiny IRC-ish server: reads `expect` command lines from the client,
/// then replies with `reply` and waits for the client to hang up.
/// Returns the lines it received, terminators stripped.
#[allow(dead_code)]
pub fn irc_peer(expect: usize, reply: &'static [&'static str]) -> (String, JoinHandle<Vec<String>>) {
    spawn_peer(move |stream| {
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut writer = stream;

        let mut received = Vec::new();
        for _ in 0..expect {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 {
                break;
            }
            received.push(line.trim_end().to_string());
        }

        for line in reply {
            writer.write_all(line.as_bytes()).unwrap();
            writer.write_all(b"\r\n").unwrap();
        }
        writer.flush().unwrap();

        // Drain until the client closes its side.
        let mut rest = String::new();
        while reader.read_line(&mut rest).map(|n| n > 0).unwrap_or(false) {
            rest.clear();
        }

        received
    })
}

#[allow(dead_code)]
pub fn run_sockless(args: &[&str]) -> Output {
    let exe = env!("CARGO_BIN_EXE_sockless");

    Command::new(exe)
        .args(args)
        .env_remove("SOCKLESS_ADDRESS")
        .env_remove("SOCKLESS_CONFIG_FILE")
        .env_remove("SOCKLESS_LOG")
        .output()
        .expect("run sockless")
}
