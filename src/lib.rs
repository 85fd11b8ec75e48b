/*!
 # csvbind

 A toolkit for reading and writing delimiter-separated text as strongly
 typed records. **csvbind** pairs a streaming tokenizer with a declarative
 mapping and conversion pipeline: raw fields are bound to your struct's
 members, or constructor parameters, by name or by position, converted
 through culture-aware type converters, and handed back as plain Rust
 values.

 ## Core Concepts

 Understanding these components will help you get started:

 - **Tokenizer:** a streaming state machine turning a character stream into
   records of raw fields, handling quoting, escaping, embedded delimiters
   and newlines, and input arriving in arbitrarily sized chunks.
 - **ClassMap:** the compiled binding specification for one target type:
   which columns feed which members, with per-binding defaults, constants,
   ignore flags and converter options. Auto-derived from the type's shape,
   customized through a fluent builder.
 - **Type Converter Registry:** bidirectional string ↔ value converters per
   semantic type, culture-aware for numbers and dates, extensible with your
   own.
 - **CsvReader / CsvWriter:** lazy, forward-only readers and writers built
   with the same fluent builders as the rest of the crate, implementing the
   [`ItemReader`](core::item::ItemReader) / [`ItemWriter`](core::item::ItemWriter)
   contract.

 ## Getting Started

 Declare your record type with [`csv_record!`], build a reader, pull typed
 rows:

```rust
use csvbind::csv_record;
use csvbind::reader::CsvReaderBuilder;

csv_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Car {
        pub year: u16,
        pub make: String,
        pub model: String,
        pub description: Option<String>,
    }
}

fn main() -> Result<(), csvbind::CsvError> {
    let csv = "year,make,model,description\n\
               1948,Porsche,356,Luxury sports car\n\
               1995,Peugeot,205,\n\
               2021,Mazda,CX-30,SUV Compact\n";

    let reader = CsvReaderBuilder::<Car>::new()
        .has_headers(true)
        .from_reader(csv.as_bytes())?;

    let cars: Vec<Car> = reader.records().collect::<Result<_, _>>()?;
    assert_eq!(cars.len(), 3);
    assert_eq!(cars[0].make, "Porsche");
    assert_eq!(cars[1].description, None);
    Ok(())
}
```

 Writing is symmetric: the same map drives column order and the header row,
 and quoting is reapplied wherever a field's text requires it.

 ## Error Handling

 Every failure is a [`CsvError`] carrying enough context (line, column,
 raw text, reason) to locate the offending data. Map-level errors (missing
 converters, duplicate bindings) fail fast at build time; missing required
 columns fail on the first read, listing every missing binding at once;
 conversion errors surface lazily, in row order, and iteration can continue
 past them under the configured policy.

 ## License

 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.
 */

/// Contract traits, configuration and culture surface.
pub mod core;

/// Error types for parsing, mapping, reading and writing.
pub mod error;

#[doc(inline)]
pub use error::*;

/// Type conversion between raw text and typed values.
pub mod convert;

/// Class maps, auto-mapping and the registration macros.
pub mod mapping;

/// Typed record reader.
pub mod reader;

/// Streaming tokenizer.
pub mod tokenizer;

/// Typed record writer.
pub mod writer;
