//! Page and loader script served to the browser

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>wasm-runner</title>
  </head>
  <body>
    <script type="module" src="/harness.js"></script>
  </body>
</html>
"#;

/// Loads `/bundle.wasm` with a minimal WASI preview1 shim, forwards console
/// output to `/output` and posts exactly one terminal report to `/report`.
pub const HARNESS_JS: &str = r#"const SUCCESS = 0;
const EBADF = 8;
const ENOSYS = 52;
const ESPIPE = 70;
const SUMMARY = /Executed (\d+) tests?, with (\d+) failures?/;

let reported = false;
let summary = null;

function post(path, body) {
  return fetch(path, {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify(body),
  });
}

async function report(body) {
  if (reported) return;
  reported = true;
  await post("/report", body);
}

function reportException(error) {
  const message = error && error.stack ? String(error.stack) : String(error);
  report({ uncaughtException: message }).catch(() => {});
}

window.addEventListener("error", (event) => reportException(event.error ?? event.message));
window.addEventListener("unhandledrejection", (event) => reportException(event.reason));

class ProcExit extends Error {
  constructor(code) {
    super(`exit(${code})`);
    this.code = code;
  }
}

const decoders = { 1: new TextDecoder(), 2: new TextDecoder() };
const pending = { 1: "", 2: "" };

function emitLine(fd, text) {
  const stream = fd === 2 ? "stderr" : "stdout";
  (fd === 2 ? console.error : console.log)(text);
  const match = SUMMARY.exec(text);
  if (match) summary = { total: Number(match[1]), failed: Number(match[2]) };
  post("/output", { stream, text }).catch(() => {});
}

function writeOutput(fd, bytes) {
  pending[fd] += decoders[fd].decode(bytes, { stream: true });
  const lines = pending[fd].split("\n");
  pending[fd] = lines.pop();
  for (const line of lines) emitLine(fd, line);
}

function flushOutput() {
  for (const fd of [1, 2]) {
    pending[fd] += decoders[fd].decode();
    if (pending[fd]) emitLine(fd, pending[fd]);
    pending[fd] = "";
  }
}

function createWasi(memory) {
  const view = () => new DataView(memory().buffer);
  const bytes = () => new Uint8Array(memory().buffer);
  const encoder = new TextEncoder();
  const args = ["bundle.wasm"];

  const imports = {
    args_sizes_get(argc, size) {
      view().setUint32(argc, args.length, true);
      view().setUint32(size, args.reduce((n, a) => n + encoder.encode(a).length + 1, 0), true);
      return SUCCESS;
    },
    args_get(argv, buf) {
      for (const [i, arg] of args.entries()) {
        const encoded = encoder.encode(arg);
        view().setUint32(argv + i * 4, buf, true);
        bytes().set(encoded, buf);
        bytes()[buf + encoded.length] = 0;
        buf += encoded.length + 1;
      }
      return SUCCESS;
    },
    environ_sizes_get(count, size) {
      view().setUint32(count, 0, true);
      view().setUint32(size, 0, true);
      return SUCCESS;
    },
    environ_get() {
      return SUCCESS;
    },
    clock_res_get(id, out) {
      view().setBigUint64(out, 1000n, true);
      return SUCCESS;
    },
    clock_time_get(id, precision, out) {
      const millis = id === 0 ? Date.now() : performance.now();
      view().setBigUint64(out, BigInt(Math.round(millis * 1e6)), true);
      return SUCCESS;
    },
    random_get(buf, len) {
      for (let offset = 0; offset < len; offset += 65536) {
        const chunk = Math.min(65536, len - offset);
        crypto.getRandomValues(new Uint8Array(memory().buffer, buf + offset, chunk));
      }
      return SUCCESS;
    },
    fd_write(fd, iovs, iovsLen, nwritten) {
      if (fd !== 1 && fd !== 2) return EBADF;
      let written = 0;
      for (let i = 0; i < iovsLen; i++) {
        const ptr = view().getUint32(iovs + i * 8, true);
        const len = view().getUint32(iovs + i * 8 + 4, true);
        writeOutput(fd, new Uint8Array(memory().buffer, ptr, len));
        written += len;
      }
      view().setUint32(nwritten, written, true);
      return SUCCESS;
    },
    fd_fdstat_get(fd, out) {
      if (fd > 2) return EBADF;
      bytes().fill(0, out, out + 24);
      view().setUint8(out, 2);
      return SUCCESS;
    },
    fd_prestat_get() {
      return EBADF;
    },
    fd_close() {
      return SUCCESS;
    },
    fd_seek() {
      return ESPIPE;
    },
    sched_yield() {
      return SUCCESS;
    },
    proc_exit(code) {
      throw new ProcExit(code);
    },
  };

  return new Proxy(imports, {
    get: (target, name) => target[name] ?? (() => ENOSYS),
  });
}

async function main() {
  let instance = null;
  const wasi = createWasi(() => instance.exports.memory);
  const response = await fetch("/bundle.wasm");
  const module = await WebAssembly.compile(await response.arrayBuffer());
  instance = await WebAssembly.instantiate(module, { wasi_snapshot_preview1: wasi });

  let code = 0;
  try {
    instance.exports._start();
  } catch (error) {
    if (!(error instanceof ProcExit)) throw error;
    code = error.code;
  }
  flushOutput();

  const total = summary ? summary.total : 0;
  const failed = summary ? summary.failed : 0;
  if (code !== 0 && failed === 0) {
    await report({ total: Math.max(total, 1), failed: 1 });
  } else {
    await report({ total, failed });
  }
}

main().catch(reportException);
"#;
