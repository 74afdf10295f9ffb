use multibuf_table::{MultiBuffer, SubBufferHandle};

fn run_scenario(capacity: usize, sub_capacity: usize) {
    let mut mb: MultiBuffer<i32> = MultiBuffer::new(capacity);
    assert_eq!(mb.len(), 0);
    assert!(mb.capacity() >= capacity);
    assert_eq!(mb.combined_sub_buffers_count(), 0);
    assert_eq!(mb.sub_buffer_count(), 0);

    for round in 1..=4usize {
        let mut handles: Vec<SubBufferHandle> = Vec::new();
        for j in 0..round {
            let requested = if j % 2 == 1 {
                sub_capacity * j
            } else {
                sub_capacity + j
            };
            let h = mb.sub_buffer_create(requested);
            handles.push(h);
            assert_eq!(mb.sub_buffer_len(h), 0);
            assert!(mb.sub_buffer_capacity(h) >= requested);

            mb.sub_buffer_clear(h);
            assert_eq!(mb.sub_buffer_len(h), 0);

            for k in 0..j {
                mb.sub_buffer_push(h, k as i32);
                assert_eq!(mb.sub_buffer_len(h), k + 1);
            }
            for k in 0..j {
                assert_eq!(mb.sub_buffer_get_at(h, k), k as i32);
            }
            for k in 0..j {
                mb.sub_buffer_set_at(h, k, 2 * k as i32);
            }
            for k in 0..j {
                assert_eq!(mb.sub_buffer_get_at(h, k), 2 * k as i32);
            }
            assert!(mb.is_tiled());
        }

        // earlier sub-buffers keep their contents after later ones grew
        for (j, &h) in handles.iter().enumerate() {
            let expected: Vec<i32> = (0..j as i32).map(|k| 2 * k).collect();
            assert_eq!(mb.sub_buffer_as_slice(h), expected.as_slice());
        }

        for h in handles {
            mb.sub_buffer_destroy(h);
            assert!(mb.is_tiled());
        }
        assert_eq!(mb.sub_buffer_count(), 0);
        assert_eq!(mb.combined_sub_buffers_count(), 0);
    }

    mb.clear();
    assert_eq!(mb.sub_buffer_count(), 0);
    assert_eq!(mb.len(), 0);
}

#[test]
fn scenario_zero_capacity() {
    run_scenario(0, 0);
}

#[test]
fn scenario_small_capacities() {
    run_scenario(1, 0);
    run_scenario(1, 4);
    run_scenario(4, 5);
}

#[test]
fn growth_keeps_values_at_their_indices() {
    let mut mb: MultiBuffer<u64> = MultiBuffer::new(0);
    let front = mb.sub_buffer_create(3);
    let back = mb.sub_buffer_create(2);
    mb.sub_buffer_push(back, 100);
    for v in 0..4u64 {
        mb.sub_buffer_push(front, v);
    }
    assert_eq!(mb.sub_buffer_capacity(front), 6);
    assert_eq!(mb.sub_buffer_as_slice(front), &[0, 1, 2, 3]);
    assert_eq!(mb.sub_buffer_as_slice(back), &[100]);
    assert_eq!(mb.len(), 8);
    assert!(mb.is_tiled());
}

#[test]
fn destroyed_capacity_is_only_reclaimed_by_reuse() {
    let mut mb: MultiBuffer<u8> = MultiBuffer::new(0);
    let a = mb.sub_buffer_create(8);
    let b = mb.sub_buffer_create(2);
    mb.sub_buffer_destroy(a);
    assert_eq!(mb.len(), 10);
    let c = mb.sub_buffer_create(3);
    assert_eq!(c, a);
    assert_eq!(mb.sub_buffer_capacity(c), 8);
    assert_eq!(mb.len(), 10);
    assert_eq!(mb.sub_buffer_offset(b), 8);
}
