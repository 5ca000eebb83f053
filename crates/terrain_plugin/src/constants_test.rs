use super::*;

#[test]
fn test_grid_index_is_row_major() {
  assert_eq!(grid_index(0, 0, 9), 0);
  assert_eq!(grid_index(8, 0, 9), 8);
  assert_eq!(grid_index(0, 1, 9), 9);
  assert_eq!(grid_index(8, 8, 9), 80);
}

#[test]
fn test_grid_index_covers_every_cell_once() {
  let res = 5;
  let mut seen = vec![false; res * res];
  for z in 0..res {
    for x in 0..res {
      let idx = grid_index(x, z, res);
      assert!(!seen[idx], "({x}, {z}) collides");
      seen[idx] = true;
    }
  }
  assert!(seen.iter().all(|s| *s));
}

#[test]
fn test_defaults_fit_limits() {
  assert!(DEFAULT_MAX_LOD <= MAX_LOD_LIMIT);
  assert!(DEFAULT_CHUNK_RESOLUTION > 0);
  assert_eq!(MAX_TEXTURES, 4, "weights are packed as RGBA");
}
