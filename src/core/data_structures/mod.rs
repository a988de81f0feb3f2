/*!
 * Data Structures
 */

mod keyed;

pub use keyed::KeyedRegistry;
