//! Address to symbol table used to annotate the disassembly.
//!
//! Map files hold one symbol per line: `<address> <size> <kind> <name>`, address and size in hex.

use parking_lot::Mutex;
use std::{fmt, fs, path::Path, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SymbolMapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

/// Anything that can hold symbols for the host to load, sort and save.
pub trait SymbolStore: Send + Sync {
    fn load(&self, path: &Path) -> Result<(), SymbolMapError>;
    fn save(&self, path: &Path) -> Result<(), SymbolMapError>;
    fn sort(&self);
    /// Forget every symbol.
    fn clear(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Data,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function => write!(f, "func"),
            Self::Data => write!(f, "data"),
        }
    }
}

impl FromStr for SymbolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "func" => Ok(Self::Function),
            "data" => Ok(Self::Data),
            _ => Err(format!("unknown symbol kind \"{s}\"")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub address: u32,
    pub size: u32,
    pub kind: SymbolKind,
    pub name: String,
}

impl Symbol {
    fn parse(line: &str) -> Result<Self, String> {
        let mut rest = line.trim();

        let address = Self::field(&mut rest, "address")?;
        let address =
            u32::from_str_radix(address, 16).map_err(|_| format!("invalid address \"{address}\""))?;
        let size = Self::field(&mut rest, "size")?;
        let size = u32::from_str_radix(size, 16).map_err(|_| format!("invalid size \"{size}\""))?;
        let kind = Self::field(&mut rest, "kind")?.parse::<SymbolKind>()?;
        if rest.is_empty() {
            return Err("missing name".to_string());
        }
        let name = rest.to_string();

        Ok(Self {
            address,
            size,
            kind,
            name,
        })
    }

    /// Split off the next whitespace separated field. Everything after it stays in `rest`.
    fn field<'a>(rest: &mut &'a str, what: &str) -> Result<&'a str, String> {
        let current: &'a str = *rest;
        let (item, tail) = current
            .split_once(char::is_whitespace)
            .unwrap_or((current, ""));
        if item.is_empty() {
            return Err(format!("missing {what}"));
        }
        *rest = tail.trim_start();
        Ok(item)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x} {:08x} {} {}",
            self.address, self.size, self.kind, self.name
        )
    }
}

#[derive(Debug, Default)]
pub struct SymbolMap {
    symbols: Mutex<Vec<Symbol>>,
}

impl SymbolMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, name: &str, address: u32, size: u32) {
        self.add_symbol(Symbol {
            address,
            size,
            kind: SymbolKind::Function,
            name: name.to_string(),
        });
    }

    pub fn add_symbol(&self, symbol: Symbol) {
        self.symbols.lock().push(symbol);
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.symbols.lock().clone()
    }

    /// The symbol covering `address`, if any.
    pub fn lookup(&self, address: u32) -> Option<Symbol> {
        self.symbols
            .lock()
            .iter()
            .find(|symbol| {
                address >= symbol.address && address - symbol.address < symbol.size.max(1)
            })
            .cloned()
    }
}

impl SymbolStore for SymbolMap {
    fn load(&self, path: &Path) -> Result<(), SymbolMapError> {
        let contents = fs::read_to_string(path)?;

        let mut symbols = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            let symbol = Symbol::parse(line).map_err(|reason| SymbolMapError::Parse {
                line: index + 1,
                reason,
            })?;
            symbols.push(symbol);
        }

        tracing::debug!("read {} symbol(s) from \"{}\"", symbols.len(), path.display());
        *self.symbols.lock() = symbols;
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<(), SymbolMapError> {
        let contents: String = self
            .symbols
            .lock()
            .iter()
            .map(|symbol| format!("{symbol}\n"))
            .collect();
        fs::write(path, contents)?;
        Ok(())
    }

    fn sort(&self) {
        self.symbols
            .lock()
            .sort_by(|a, b| a.address.cmp(&b.address).then_with(|| a.name.cmp(&b.name)));
    }

    fn clear(&self) {
        self.symbols.lock().clear();
    }
}
