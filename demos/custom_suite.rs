use std::hint::black_box;
use std::time::Duration;

use databench::dataset::{self, Person};
use databench::{Runner, Sampler, Suite, Trial};

fn csv_format(person: &Person) -> String {
    format!("{},{},{}\n", person.name, person.email, person.age)
}

fn csv_push(person: &Person) -> String {
    let mut line = String::with_capacity(person.name.len() + person.email.len() + 8);
    line.push_str(&person.name);
    line.push(',');
    line.push_str(&person.email);
    line.push(',');
    line.push_str(&person.age.to_string());
    line.push('\n');
    line
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    databench::init_logging();

    // No external state, so the unit fixture will do.
    let summary = Runner::new(())
        .sampler(Sampler::new(Duration::from_millis(5), Duration::from_secs(1)))
        .suite("serialize a row as CSV", |_: &()| {
            let people = dataset::people(64);
            let rows = people.clone();
            let mut i = 0;
            let mut j = 0;
            Ok(Suite::new("serialize a row as CSV")
                .add(Trial::sync("format!", move || {
                    i = (i + 1) % people.len();
                    black_box(csv_format(&people[i]));
                    Ok(())
                }))?
                .add(Trial::sync("push_str", move || {
                    j = (j + 1) % rows.len();
                    black_box(csv_push(&rows[j]));
                    Ok(())
                }))?)
        })
        .suite("always fails", |_: &()| {
            Ok(Suite::new("always fails").add(Trial::sync("broken", || {
                Err(anyhow::anyhow!("this trial never succeeds"))
            }))?)
        })
        .run()
        .await;

    println!("clean run: {}", summary.is_clean());
    Ok(())
}
