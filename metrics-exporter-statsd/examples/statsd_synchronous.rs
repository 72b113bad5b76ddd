use std::{thread, time::Duration};

use metrics_exporter_statsd::{Label, MetricSink, StatsdBuilder};

fn main() {
    tracing_subscriber::fmt::init();

    let sink = StatsdBuilder::default()
        .with_remote_address("localhost:9125")
        .expect("failed to parse remote address")
        .with_queue_capacity(1024)
        .build()
        .expect("failed to build statsd sink");

    sink.emit_key(&["example", "started"], 1.0);
    sink.set_gauge(&["example", "testing"], 42.0);

    let labels = [Label::new("system", "foo")];

    // Loop for a while, pretending to do some work.
    for i in 0..1_000u16 {
        sink.incr_counter_with_labels(&["example", "server_loops"], 1.0, &labels);
        sink.add_sample(&["example", "loop delta"], f32::from(i % 100) / 10.0);
        sink.set_precision_gauge(&["example", "progress"], f64::from(i) / 1_000.0);

        thread::sleep(Duration::from_millis(5));
    }

    sink.shutdown();
}
