//! Static standard-library module membership.
//!
//! `flay.bundle.package` asks a live interpreter via `stdlib_list.in_stdlib`;
//! `bundleshake` cannot assume a Python interpreter is even installed, so
//! membership is a static list shipped per target-language version instead
//! (spec §4.3 "Standard-library membership is determined by a static list
//! shipped per target-language version").
//!
//! The list below targets CPython 3.12's top-level standard library package
//! names (the ones that can appear as the head of a dotted import).

use rustc_hash::FxHashSet;
use std::sync::OnceLock;

/// Top-level standard-library package/module names for CPython 3.12.
const STDLIB_TOP_LEVEL: &[&str] = &[
    "__future__",
    "_thread",
    "abc",
    "aifc",
    "argparse",
    "array",
    "ast",
    "asyncio",
    "atexit",
    "base64",
    "bdb",
    "binascii",
    "bisect",
    "builtins",
    "bz2",
    "calendar",
    "cgi",
    "cgitb",
    "chunk",
    "cmath",
    "cmd",
    "code",
    "codecs",
    "codeop",
    "collections",
    "colorsys",
    "compileall",
    "concurrent",
    "configparser",
    "contextlib",
    "contextvars",
    "copy",
    "copyreg",
    "cProfile",
    "csv",
    "ctypes",
    "dataclasses",
    "datetime",
    "dbm",
    "decimal",
    "difflib",
    "dis",
    "doctest",
    "email",
    "encodings",
    "ensurepip",
    "enum",
    "errno",
    "faulthandler",
    "fcntl",
    "filecmp",
    "fileinput",
    "fnmatch",
    "fractions",
    "ftplib",
    "functools",
    "gc",
    "getopt",
    "getpass",
    "gettext",
    "glob",
    "graphlib",
    "grp",
    "gzip",
    "hashlib",
    "heapq",
    "hmac",
    "html",
    "http",
    "idlelib",
    "imaplib",
    "imghdr",
    "importlib",
    "inspect",
    "io",
    "ipaddress",
    "itertools",
    "json",
    "keyword",
    "lib2to3",
    "linecache",
    "locale",
    "logging",
    "lzma",
    "mailbox",
    "mailcap",
    "marshal",
    "math",
    "mimetypes",
    "mmap",
    "modulefinder",
    "msilib",
    "msvcrt",
    "multiprocessing",
    "netrc",
    "nis",
    "nntplib",
    "numbers",
    "operator",
    "optparse",
    "os",
    "ossaudiodev",
    "pathlib",
    "pdb",
    "pickle",
    "pickletools",
    "pipes",
    "pkgutil",
    "platform",
    "plistlib",
    "poplib",
    "posix",
    "pprint",
    "profile",
    "pstats",
    "pty",
    "pwd",
    "py_compile",
    "pyclbr",
    "pydoc",
    "queue",
    "quopri",
    "random",
    "re",
    "readline",
    "reprlib",
    "resource",
    "rlcompleter",
    "runpy",
    "sched",
    "secrets",
    "select",
    "selectors",
    "shelve",
    "shlex",
    "shutil",
    "signal",
    "site",
    "smtplib",
    "sndhdr",
    "socket",
    "socketserver",
    "spwd",
    "sqlite3",
    "ssl",
    "stat",
    "statistics",
    "string",
    "stringprep",
    "struct",
    "subprocess",
    "sunau",
    "symtable",
    "sys",
    "sysconfig",
    "syslog",
    "tabnanny",
    "tarfile",
    "telnetlib",
    "tempfile",
    "termios",
    "textwrap",
    "threading",
    "time",
    "timeit",
    "tkinter",
    "token",
    "tokenize",
    "tomllib",
    "trace",
    "traceback",
    "tracemalloc",
    "tty",
    "turtle",
    "turtledemo",
    "types",
    "typing",
    "unicodedata",
    "unittest",
    "urllib",
    "uu",
    "uuid",
    "venv",
    "warnings",
    "wave",
    "weakref",
    "webbrowser",
    "winreg",
    "winsound",
    "wsgiref",
    "xdrlib",
    "xml",
    "xmlrpc",
    "zipapp",
    "zipfile",
    "zipimport",
    "zlib",
    "zoneinfo",
];

static STDLIB_SET: OnceLock<FxHashSet<&'static str>> = OnceLock::new();

/// Whether `top_level_name` (the first dotted segment of a module spec) is a
/// standard-library module for the target language version this crate ships
/// a list for.
#[must_use]
pub fn is_stdlib_module(top_level_name: &str) -> bool {
    STDLIB_SET
        .get_or_init(|| STDLIB_TOP_LEVEL.iter().copied().collect())
        .contains(top_level_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_common_stdlib_modules() {
        assert!(is_stdlib_module("os"));
        assert!(is_stdlib_module("typing"));
        assert!(is_stdlib_module("contextlib"));
    }

    #[test]
    fn rejects_third_party_modules() {
        assert!(!is_stdlib_module("requests"));
        assert!(!is_stdlib_module("numpy"));
    }
}
