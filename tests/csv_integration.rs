use std::env::temp_dir;
use std::error::Error;
use std::fs;

use chrono::NaiveDate;
use rand::distr::{Alphanumeric, SampleString};

use csvbind::convert::DateStyles;
use csvbind::csv_enum;
use csvbind::csv_record;
use csvbind::core::culture::Culture;
use csvbind::core::item::{ItemReader, ItemWriter};
use csvbind::mapping::ClassMap;
use csvbind::reader::CsvReaderBuilder;
use csvbind::writer::CsvWriterBuilder;

csv_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Product {
        pub id: String,
        pub name: String,
        pub price: f64,
        pub description: Option<String>,
        pub available: bool,
    }
}

fn sample_products() -> Vec<Product> {
    vec![
        Product {
            id: "P001".to_string(),
            name: "Wireless Headphones".to_string(),
            price: 79.99,
            description: Some("Noise-cancelling, 20hr battery".to_string()),
            available: true,
        },
        Product {
            id: "P002".to_string(),
            name: "USB-C Cable".to_string(),
            price: 12.99,
            description: None,
            available: false,
        },
    ]
}

#[test]
fn round_trip_through_a_file() -> Result<(), Box<dyn Error>> {
    let file_name = Alphanumeric.sample_string(&mut rand::rng(), 16);
    let path = temp_dir().join(format!("{}.csv", file_name));

    let writer = CsvWriterBuilder::<Product>::new()
        .has_headers(true)
        .from_path(&path)?;
    for product in &sample_products() {
        writer.write(product)?;
    }
    writer.flush()?;
    drop(writer);

    let reader = CsvReaderBuilder::<Product>::new()
        .has_headers(true)
        .from_path(&path)?;
    let read_back: Vec<Product> = reader.records().collect::<Result<_, _>>()?;

    assert_eq!(read_back, sample_products());
    fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn written_output_quotes_only_where_needed() -> Result<(), Box<dyn Error>> {
    let writer = CsvWriterBuilder::<Product>::new()
        .has_headers(true)
        .from_writer(Vec::new())?;
    writer.write(&sample_products()[0])?;

    let data = String::from_utf8(writer.into_inner()?)?;
    assert_eq!(
        data,
        "id,name,price,description,available\n\
         P001,Wireless Headphones,79.99,\"Noise-cancelling, 20hr battery\",true\n"
    );
    Ok(())
}

#[test]
fn header_order_does_not_matter_for_name_binding() -> Result<(), Box<dyn Error>> {
    let straight = "id,name,price,description,available\nP9,Widget,1.5,,true\n";
    let shuffled = "available,price,name,description,id\ntrue,1.5,Widget,,P9\n";

    let read = |data: &'static str| -> Result<Product, Box<dyn Error>> {
        let reader = CsvReaderBuilder::<Product>::new()
            .has_headers(true)
            .from_reader(data.as_bytes())?;
        Ok(reader.read()?.expect("one record"))
    };

    assert_eq!(read(straight)?, read(shuffled)?);
    Ok(())
}

#[test]
fn two_readers_over_the_same_data_yield_identical_sequences() -> Result<(), Box<dyn Error>> {
    let data = "id,name,price,description,available\n\
                P1,A,1.0,,true\n\
                P2,B,2.0,x,false\n";

    let run = || -> Result<Vec<Product>, csvbind::CsvError> {
        CsvReaderBuilder::<Product>::new()
            .has_headers(true)
            .from_reader(data.as_bytes())?
            .records()
            .collect()
    };

    assert_eq!(run()?, run()?);
    Ok(())
}

csv_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Person {
        pub id: u32,
        pub name: String,
    }
}

#[test]
fn positional_binding_without_header_consumes_no_header_row() -> Result<(), Box<dyn Error>> {
    let reader = CsvReaderBuilder::<Person>::new()
        .has_headers(false)
        .from_reader("1,John\n2,Jane\n".as_bytes())?;

    let people: Vec<Person> = reader.records().collect::<Result<_, _>>()?;
    assert_eq!(
        people,
        vec![
            Person {
                id: 1,
                name: "John".to_string()
            },
            Person {
                id: 2,
                name: "Jane".to_string()
            },
        ]
    );
    Ok(())
}

#[test]
fn reading_from_a_path_streams_the_file() -> Result<(), Box<dyn Error>> {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new()?;
    write!(file, "id,name\n1,A\n2,B\n")?;
    file.flush()?;

    let reader = CsvReaderBuilder::<Person>::new()
        .has_headers(true)
        .from_path(file.path())?;
    let people: Vec<Person> = reader.records().collect::<Result<_, _>>()?;
    assert_eq!(people.len(), 2);
    assert_eq!(people[1].name, "B");
    Ok(())
}

csv_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Entry {
        pub id: i64,
        pub date: NaiveDate,
    }
}

#[test]
fn leading_whitespace_in_dates_needs_the_style_override() -> Result<(), Box<dyn Error>> {
    let data = "id,date\n1, 12/25/2020\n";

    // Strict parsing rejects the padded field.
    let strict = CsvReaderBuilder::<Entry>::new()
        .has_headers(true)
        .from_reader(data.as_bytes())?;
    assert!(strict.read().is_err());

    // The per-binding AllowLeadingWhite style accepts it; the invariant
    // culture parses the m/d/y form.
    let map = ClassMap::builder::<Entry>()
        .member("date", |m| m.date_styles(DateStyles::allow_leading_white()))
        .build()?;
    let reader = CsvReaderBuilder::<Entry>::new()
        .has_headers(true)
        .class_map(map)
        .from_reader(data.as_bytes())?;

    let entry = reader.read()?.expect("one record");
    assert_eq!(entry.id, 1);
    assert_eq!(entry.date, NaiveDate::from_ymd_opt(2020, 12, 25).unwrap());
    Ok(())
}

csv_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Named {
        pub id: i64,
        pub name: Option<String>,
    }
}

#[test]
fn ignored_on_read_member_is_still_written() -> Result<(), Box<dyn Error>> {
    let map = ClassMap::builder::<Named>()
        .member("name", |m| m.ignore_on_read())
        .build()?;

    let writer = CsvWriterBuilder::<Named>::new()
        .has_headers(false)
        .class_map(map)
        .from_writer(Vec::new())?;
    writer.write(&Named { id: 1, name: None })?;

    let data = String::from_utf8(writer.into_inner()?)?;
    assert_eq!(data, "1,\n");
    Ok(())
}

#[test]
fn constructor_binding_skips_ignored_parameters() -> Result<(), Box<dyn Error>> {
    let map = ClassMap::builder::<Named>()
        .use_constructor()
        .parameter("name", |p| p.ignore())
        .build()?;

    // Headerless: the ignored parameter consumes no position.
    let reader = CsvReaderBuilder::<Named>::new()
        .has_headers(false)
        .class_map(map.clone())
        .from_reader("1\n".as_bytes())?;
    assert_eq!(reader.read()?, Some(Named { id: 1, name: None }));

    // With a header, the missing `name` column is no error either.
    let reader = CsvReaderBuilder::<Named>::new()
        .has_headers(true)
        .class_map(map)
        .from_reader("id\n1\n".as_bytes())?;
    assert_eq!(reader.read()?, Some(Named { id: 1, name: None }));
    Ok(())
}

csv_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Address {
        pub street: String,
        pub city: String,
    }
}

csv_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Customer {
        pub id: i64,
        pub address: Address,
    }
}

#[test]
fn nested_records_bind_through_prefixed_columns() -> Result<(), Box<dyn Error>> {
    let data = "id,address.street,address.city\n5,1 Main St,Boston\n";
    let reader = CsvReaderBuilder::<Customer>::new()
        .has_headers(true)
        .from_reader(data.as_bytes())?;

    let customer = reader.read()?.expect("one record");
    assert_eq!(
        customer,
        Customer {
            id: 5,
            address: Address {
                street: "1 Main St".to_string(),
                city: "Boston".to_string(),
            },
        }
    );

    let writer = CsvWriterBuilder::<Customer>::new()
        .has_headers(true)
        .from_writer(Vec::new())?;
    writer.write(&customer)?;
    assert_eq!(String::from_utf8(writer.into_inner()?)?, data);
    Ok(())
}

csv_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Spread {
        pub id: i64,
        pub legs: Vec<i32>,
    }
}

#[test]
fn collection_members_bind_to_an_index_range() -> Result<(), Box<dyn Error>> {
    let map = ClassMap::builder::<Spread>()
        .member("legs", |m| m.range(1, 3))
        .build()?;

    let reader = CsvReaderBuilder::<Spread>::new()
        .has_headers(false)
        .class_map(map.clone())
        .from_reader("7,10,20,30\n".as_bytes())?;
    let spread = reader.read()?.expect("one record");
    assert_eq!(spread.legs, vec![10, 20, 30]);

    let writer = CsvWriterBuilder::<Spread>::new()
        .has_headers(false)
        .class_map(map)
        .from_writer(Vec::new())?;
    writer.write(&spread)?;
    assert_eq!(String::from_utf8(writer.into_inner()?)?, "7,10,20,30\n");
    Ok(())
}

#[test]
fn collection_members_bind_by_name_suffix() -> Result<(), Box<dyn Error>> {
    let map = ClassMap::builder::<Spread>()
        .member("legs", |m| m.indexed("leg"))
        .build()?;

    let data = "id,leg2,leg1\n7,20,10\n";
    let reader = CsvReaderBuilder::<Spread>::new()
        .has_headers(true)
        .class_map(map)
        .from_reader(data.as_bytes())?;

    let spread = reader.read()?.expect("one record");
    // Suffix numbers, not header positions, order the elements.
    assert_eq!(spread.legs, vec![10, 20]);
    Ok(())
}

csv_enum! {
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum Side {
        Buy,
        Sell,
    }
}

csv_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Trade {
        pub id: i64,
        pub side: Side,
    }
}

#[test]
fn enums_bind_by_name_case_insensitively() -> Result<(), Box<dyn Error>> {
    let reader = CsvReaderBuilder::<Trade>::new()
        .has_headers(true)
        .from_reader("id,side\n1,sell\n2,BUY\n".as_bytes())?;

    let trades: Vec<Trade> = reader.records().collect::<Result<_, _>>()?;
    assert_eq!(trades[0].side, Side::Sell);
    assert_eq!(trades[1].side, Side::Buy);
    Ok(())
}

csv_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Measurement {
        pub label: String,
        pub reading: f64,
    }
}

#[test]
fn german_culture_round_trips_floats() -> Result<(), Box<dyn Error>> {
    let writer = CsvWriterBuilder::<Measurement>::new()
        .has_headers(false)
        .delimiter(b';')
        .culture(Culture::de_de())
        .from_writer(Vec::new())?;
    writer.write(&Measurement {
        label: "temp".to_string(),
        reading: 21.5,
    })?;
    let data = String::from_utf8(writer.into_inner()?)?;
    assert_eq!(data, "temp;21,5\n");

    let reader = CsvReaderBuilder::<Measurement>::new()
        .has_headers(false)
        .delimiter(b';')
        .culture(Culture::de_de())
        .from_reader(data.as_bytes())?;
    let back = reader.read()?.expect("one record");
    assert_eq!(back.reading, 21.5);
    Ok(())
}

#[test]
fn hostile_field_content_survives_the_quoting_round_trip() -> Result<(), Box<dyn Error>> {
    let hostile = vec![
        Person {
            id: 1,
            name: "plain".to_string(),
        },
        Person {
            id: 2,
            name: "comma, inside".to_string(),
        },
        Person {
            id: 3,
            name: "she said \"hi\"".to_string(),
        },
        Person {
            id: 4,
            name: "line\nbreak and \r\n crlf".to_string(),
        },
        Person {
            id: 5,
            name: String::new(),
        },
    ];

    let writer = CsvWriterBuilder::<Person>::new()
        .has_headers(true)
        .from_writer(Vec::new())?;
    for person in &hostile {
        writer.write(person)?;
    }
    let data = String::from_utf8(writer.into_inner()?)?;

    let reader = CsvReaderBuilder::<Person>::new()
        .has_headers(true)
        .from_reader(data.as_bytes())?;
    let read_back: Vec<Person> = reader.records().collect::<Result<_, _>>()?;
    assert_eq!(read_back, hostile);
    Ok(())
}

#[test]
fn reader_and_writer_satisfy_the_item_contracts() -> Result<(), Box<dyn Error>> {
    fn drain<T>(reader: &dyn ItemReader<T>) -> Result<Vec<T>, csvbind::CsvError> {
        let mut items = Vec::new();
        while let Some(item) = reader.read()? {
            items.push(item);
        }
        Ok(items)
    }

    fn copy_all<T>(items: &[T], writer: &dyn ItemWriter<T>) -> Result<(), csvbind::CsvError> {
        for item in items {
            writer.write(item)?;
        }
        writer.flush()
    }

    let reader = CsvReaderBuilder::<Person>::new()
        .has_headers(false)
        .from_reader("1,John\n2,Jane\n".as_bytes())?;
    let people = drain(&reader)?;
    assert_eq!(people.len(), 2);

    let writer = CsvWriterBuilder::<Person>::new()
        .has_headers(false)
        .from_writer(Vec::new())?;
    copy_all(&people, &writer)?;
    assert_eq!(String::from_utf8(writer.into_inner()?)?, "1,John\n2,Jane\n");
    Ok(())
}

#[test]
fn constants_and_defaults_apply_per_binding() -> Result<(), Box<dyn Error>> {
    use csvbind::convert::Value;

    let map = ClassMap::builder::<Person>()
        .member("name", |m| {
            m.optional()
                .default_value(Value::Str("unknown".to_string()))
        })
        .build()?;

    let reader = CsvReaderBuilder::<Person>::new()
        .has_headers(true)
        .class_map(map)
        .from_reader("id\n9\n".as_bytes())?;

    assert_eq!(
        reader.read()?,
        Some(Person {
            id: 9,
            name: "unknown".to_string()
        })
    );
    Ok(())
}
