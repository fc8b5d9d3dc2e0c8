/*
   Directory uniqueness guard
   Copyright (C) David Mulder <dmulder@samba.org> 2024

   This program is free software; you can redistribute it and/or modify
   it under the terms of the GNU General Public License as published by
   the Free Software Foundation; either version 3 of the License, or
   (at your option) any later version.

   This program is distributed in the hope that it will be useful,
   but WITHOUT ANY WARRANTY; without even the implied warranty of
   MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
   GNU General Public License for more details.

   You should have received a copy of the GNU General Public License
   along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
use std::fmt::Write;

/// Escape an assertion value for use inside an LDAP search filter
/// (RFC 4515). The value is treated as opaque bytes: the filter
/// metacharacters `*`, `(`, `)`, `\`, NUL and anything outside printable
/// ASCII are written as `\xx`.
pub fn escape_value(value: &[u8]) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value {
        match b {
            b'*' | b'(' | b')' | b'\\' => {
                let _ = write!(out, "\\{:02x}", b);
            }
            0x20..=0x7e => out.push(*b as char),
            _ => {
                let _ = write!(out, "\\{:02x}", b);
            }
        }
    }
    out
}

/// Build `(attr=value)` with the value escaped.
pub fn equality(attribute: &str, value: &[u8]) -> String {
    format!("({}={})", attribute, escape_value(value))
}
