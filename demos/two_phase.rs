use cpc_aggregate::harness::{aggregate_complete, aggregate_two_phase};
use cpc_aggregate::{CpcSketch, DataToSketch, DataType, Value};

fn main() {
    let arg_types = [DataType::String, DataType::Int];
    let rows: Vec<Vec<Value>> = (0..10_000)
        .map(|i| vec![Value::from(format!("user{}", i % 2_500)), Value::Int(12)])
        .collect();

    let complete = aggregate_complete(DataToSketch::new(), &arg_types, &rows).unwrap();
    let partitions: Vec<Vec<Vec<Value>>> = rows.chunks(3_000).map(<[_]>::to_vec).collect();
    let two_phase = aggregate_two_phase(DataToSketch::new(), &arg_types, &partitions).unwrap();
    println!("two-phase result is byte identical = {}", complete == two_phase);

    let bytes = complete.as_binary().unwrap();
    let sketch = CpcSketch::deserialize(bytes, cpc_aggregate::DEFAULT_SEED).unwrap();
    println!("sketch = {:?}", sketch);
    println!("estimate = {:.1}", sketch.estimate());
}
